//! Canned-response lookup
//!
//! Three tables drive everything the assistant says outside the scripted
//! lesson and lead-capture prompts: the termination vocabulary, the local
//! topic table, and the ordered heuristic rules used by the simulated lookup.
//! All matching is substring-based on lower-cased input, first match wins.

use serde::{Deserialize, Serialize};

// ============================================================================
// Replies
// ============================================================================

/// Text to display plus the variant to speak aloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    pub speech: String,
}

impl Reply {
    pub fn new(text: impl Into<String>, speech: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speech: speech.into(),
        }
    }

    /// Reply whose spoken form is the displayed text
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            speech: text.clone(),
            text,
        }
    }

    /// Degraded answer used when the lookup fails
    pub fn apology() -> Self {
        Self::new(
            "Sorry, the AI service is currently unavailable. Please contact us via WhatsApp or try asking about 'greetings'.",
            "क्षमा करें",
        )
    }
}

// ============================================================================
// Termination vocabulary
// ============================================================================

pub const TERMINATION_KEYWORDS: [&str; 8] = [
    "stop",
    "end",
    "close",
    "thank you",
    "done",
    "finish",
    "exit",
    "bye",
];

/// Substring test, so "ok bye!" and "that's the end" both count
pub fn is_termination(input: &str) -> bool {
    let lower = input.trim().to_lowercase();
    TERMINATION_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

// ============================================================================
// Local topic table
// ============================================================================

/// A topic entry keyed by pipe-delimited aliases, e.g. `"fee|fees|price"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    pub aliases: String,
    pub reply: Reply,
}

impl TopicEntry {
    pub fn new(aliases: impl Into<String>, reply: Reply) -> Self {
        Self {
            aliases: aliases.into(),
            reply,
        }
    }

    fn matches(&self, lower_input: &str) -> bool {
        self.aliases
            .split('|')
            .filter(|alias| !alias.is_empty())
            .any(|alias| lower_input.contains(&alias.to_lowercase()))
    }
}

/// Ordered topic table. Entry order is the tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTable {
    entries: Vec<TopicEntry>,
}

impl TopicTable {
    pub fn new(entries: Vec<TopicEntry>) -> Self {
        Self { entries }
    }

    pub fn academy() -> Self {
        Self::new(vec![
            TopicEntry::new(
                "greetings|hello|வணக்கம்",
                Reply::new(
                    "**Hindi Greetings / வாழ்த்துகள்:**\n\nThe formal and respectful greeting is **Namaste** (नमस्ते).\n\n**English Translation:** Hello/Greetings\n**Tamil Translation:** Vanakkam (வணக்கம்)",
                    "नमस्ते",
                ),
            ),
            TopicEntry::new(
                "numbers|எண்கள்|संख्या",
                Reply::new(
                    "**Hindi Numbers / எண்கள்:**\n\n**One:** Ek (एक)\n**Two:** Do (दो)\n\nThese are essential for counting!",
                    "Here are the first few numbers.",
                ),
            ),
            TopicEntry::new(
                "course|courses|क्लास|classes",
                Reply::new(
                    "📚 **Our Hindi Courses:**\nWe offer structured courses at Raanuva Veeran Academy. Contact us via WhatsApp for enrollment!",
                    "हम कोर्स प्रदान करते हैं",
                ),
            ),
            TopicEntry::new(
                "fee|fees|price|cost",
                Reply::new(
                    "💰 **Course Fees:**\nMonthly: ₹5,000 per month. Please contact us on WhatsApp for flexible installment options.",
                    "हमारे कोर्स की फीस पांच हजार रुपये प्रति माह है",
                ),
            ),
        ])
    }

    pub fn lookup(&self, input: &str) -> Option<&Reply> {
        let lower = input.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.matches(&lower))
            .map(|entry| &entry.reply)
    }
}

impl Default for TopicTable {
    fn default() -> Self {
        Self::academy()
    }
}

// ============================================================================
// Quick-reply suggestions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SuggestionId(pub u8);

/// A quick-reply button standing in for a typed question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: SuggestionId,
    pub label: String,
    /// Text submitted on the visitor's behalf when the button is clicked
    pub query: String,
}

impl Suggestion {
    fn new(id: u8, label: &str, query: &str) -> Self {
        Self {
            id: SuggestionId(id),
            label: label.to_string(),
            query: query.to_string(),
        }
    }
}

/// Course info, fees and a sample translation
pub fn academy_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion::new(0, "📚 Course details", "Tell me about your courses"),
        Suggestion::new(1, "💰 Fees", "What are the fees?"),
        Suggestion::new(2, "🍛 Translate \"food\"", "How do I say food in Hindi?"),
    ]
}

// ============================================================================
// Heuristic rules for the simulated lookup
// ============================================================================

/// One `(predicate, builder)` pair. Predicates see lower-cased input; builders see the original.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub predicate: fn(&str) -> bool,
    pub respond: fn(&str) -> Reply,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

const LOOKUP_SPEECH: &str = "Here is the information you requested.";

fn mentions_any(lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| lower.contains(needle))
}

fn is_food(lower: &str) -> bool {
    mentions_any(lower, &["food", "eat"])
}

fn is_travel(lower: &str) -> bool {
    mentions_any(lower, &["travel", "go"])
}

fn is_politeness(lower: &str) -> bool {
    mentions_any(lower, &["please", "kindly"])
}

/// Word match rather than substring: "hi" is inside "hindi"
fn is_greeting(lower: &str) -> bool {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| matches!(word, "hi" | "hey" | "hello" | "namaste" | "namaskar"))
}

fn food_reply(_input: &str) -> Reply {
    Reply::new(
        "The Hindi word for food/meal is **Khaana** (खाना).\n\n**English Translation:** Food/Meal\n**Tamil Translation:** Unavu (உணவு)\n\n**Example Usage:** \"Is the food good?\" translates to \"Kya khaana achha hai?\"",
        LOOKUP_SPEECH,
    )
}

fn travel_reply(_input: &str) -> Reply {
    Reply::new(
        "The basic verb 'to go' is **Jaana** (जाना).\n\n**English Translation:** To Go\n**Tamil Translation:** Selvathu (செல்வது)\n\n**Example Usage:** To say \"I am going,\" you would say \"Main jaa raha hoon.\"",
        LOOKUP_SPEECH,
    )
}

fn politeness_reply(_input: &str) -> Reply {
    Reply::new(
        "The best word for please is **Kripya** (कृपया).\n\n**English Translation:** Please\n**Tamil Translation:** Thayavuseydhu (தயவுசெய்து)",
        "कृपया",
    )
}

fn greeting_reply(_input: &str) -> Reply {
    Reply::new(
        "**Namaste** (नमस्ते)! That is how you greet someone respectfully in Hindi.\n\n**Tamil Translation:** Vanakkam (வணக்கம்)",
        "नमस्ते",
    )
}

fn fallback_reply(input: &str) -> Reply {
    let first_word = input.split_whitespace().next().unwrap_or(input);
    Reply::new(
        format!(
            "I see you are asking about **{first_word}**! The Hindi word for 'Need' or 'Requirement' is a valuable word to learn: **Zaroorat** (ज़रूरत).\n\nWhat other words do you need translated?"
        ),
        "ज़रूरत",
    )
}

/// Ordered rule list; the last rule always matches
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    fallback: Rule,
}

impl RuleSet {
    /// Custom rules tried in order before the fallback
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            fallback: Rule {
                name: "fallback",
                predicate: |_| true,
                respond: fallback_reply,
            },
        }
    }

    pub fn academy() -> Self {
        Self::new(vec![
            Rule {
                name: "food",
                predicate: is_food,
                respond: food_reply,
            },
            Rule {
                name: "travel",
                predicate: is_travel,
                respond: travel_reply,
            },
            Rule {
                name: "politeness",
                predicate: is_politeness,
                respond: politeness_reply,
            },
            Rule {
                name: "greeting",
                predicate: is_greeting,
                respond: greeting_reply,
            },
        ])
    }

    /// Name of the rule that would answer `input`
    pub fn classify(&self, input: &str) -> &'static str {
        self.select(&input.to_lowercase()).name
    }

    pub fn answer(&self, input: &str) -> Reply {
        let rule = self.select(&input.to_lowercase());
        (rule.respond)(input)
    }

    fn select(&self, lower: &str) -> &Rule {
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(lower))
            .unwrap_or(&self.fallback)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::academy()
    }
}
