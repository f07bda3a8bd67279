//! Academy chat widget - Hindi lesson and lead-capture assistant
//!
//! Runs one widget session in the terminal. Assistant output is printed to
//! stdout, logs go to stderr.

mod config;
mod curriculum;
mod lead;
mod responder;
mod runtime;
mod speech;
mod state_machine;

use config::ChatConfig;
use responder::SuggestionId;
use runtime::{
    ChatHandle, ChatWidget, JsonlLeadSink, LeadSink, LoggingLeadSink, LoggingSpeaker,
    ProductionWidget, RuntimeSettings, SimulatedResolver, WidgetClosed, WidgetEvent,
};
use state_machine::{Choice, Controls, Message, MessageId, Origin};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ChatConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "academy_chat=info".into()),
        )
        .with(config.log_json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
        }))
        .with((!config.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    let lead_sink: Arc<dyn LeadSink> = match &config.leads_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!(path = %path.display(), "Appending leads to file");
            Arc::new(JsonlLeadSink::new(path))
        }
        None => {
            tracing::info!("ACADEMY_CHAT_LEADS_PATH not set, leads will only be logged");
            Arc::new(LoggingLeadSink)
        }
    };

    let widget: ProductionWidget = ChatWidget::new(
        SimulatedResolver::new(config.lookup_delay),
        LoggingSpeaker,
        lead_sink,
        RuntimeSettings::from(&config),
    );

    let mut handle = widget.open();
    tracing::info!(session_id = %handle.session_id(), "Chat widget opened");
    print_help();
    println!("Talk to us on WhatsApp: {}", config.contact_url);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(WidgetEvent::Closed) | None => {
                    println!("(chat closed) WhatsApp: {}", config.contact_url);
                    break;
                }
                Some(event) => render(&event),
            },
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Help => print_help(),
                    input => {
                        if let Err(e) = dispatch(&handle, input).await {
                            tracing::warn!(error = %e, "Dropping input");
                            break;
                        }
                    }
                }
            }
        }
    }

    handle.close().await;
    Ok(())
}

/// One line typed at the prompt
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Text(String),
    Choice(Choice),
    Pick(SuggestionId),
    Reset,
    StopSpeaking,
    Listen(MessageId),
    Help,
    Quit,
}

fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    let mut words = trimmed.split_whitespace();
    match words.next() {
        Some("/yes") => Input::Choice(Choice::Yes),
        Some("/no") => Input::Choice(Choice::No),
        Some("/reset") => Input::Reset,
        Some("/stop") => Input::StopSpeaking,
        Some("/help") => Input::Help,
        Some("/quit") => Input::Quit,
        Some("/pick") => match words.next().and_then(|n| n.parse().ok()) {
            Some(id) => Input::Pick(SuggestionId(id)),
            None => Input::Help,
        },
        Some("/listen") => match words.next().and_then(|n| n.parse().ok()) {
            Some(id) => Input::Listen(MessageId(id)),
            None => Input::Help,
        },
        _ => Input::Text(trimmed.to_string()),
    }
}

async fn dispatch(handle: &ChatHandle, input: Input) -> Result<(), WidgetClosed> {
    match input {
        Input::Text(text) => handle.submit_text(text).await,
        Input::Choice(choice) => handle.submit_choice(choice).await,
        Input::Pick(id) => handle.pick_suggestion(id).await,
        Input::Reset => handle.reset().await,
        Input::StopSpeaking => handle.stop_speaking().await,
        Input::Listen(id) => handle.replay(id).await,
        Input::Help | Input::Quit => Ok(()),
    }
}

fn print_help() {
    println!("Commands: /yes  /no  /pick <n>  /listen <n>  /reset  /stop  /help  /quit");
}

fn render(event: &WidgetEvent) {
    match event {
        WidgetEvent::Message { message } => render_message(message),
        WidgetEvent::StateChanged { hint, .. } => {
            if hint.enabled {
                println!("  ({})", hint.placeholder);
            } else {
                println!("  ({}) [input disabled]", hint.placeholder);
            }
        }
        WidgetEvent::Rejected { reason } => println!("  ! {reason}"),
        WidgetEvent::Cleared => println!("--- new conversation ---"),
        WidgetEvent::Retracted { .. } | WidgetEvent::Closed => {}
    }
}

fn render_message(message: &Message) {
    match message.origin {
        // Typed at the prompt already
        Origin::User => {}
        Origin::Assistant if message.placeholder => println!("bot: {}", message.text),
        Origin::Assistant => {
            println!("bot [{}]: {}", message.id.0, message.text);
            match &message.controls {
                Controls::None => {}
                Controls::YesNo => {
                    println!("  /yes  {}", Choice::Yes.label());
                    println!("  /no   {}", Choice::No.label());
                }
                Controls::Suggestions(suggestions) => {
                    for suggestion in suggestions {
                        println!("  /pick {}  {}", suggestion.id.0, suggestion.label);
                    }
                }
            }
        }
    }
}
