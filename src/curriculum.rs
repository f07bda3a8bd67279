//! Guided lesson curriculum and the cursor that walks it

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One step of the guided curriculum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub topic: String,
    /// Text shown in the transcript (light markdown)
    pub text: String,
    /// Spoken variant handed to the speech collaborator
    pub speech: String,
    /// Literal the visitor must type to move past this lesson
    pub advance_token: String,
}

impl Lesson {
    pub fn new(
        topic: impl Into<String>,
        text: impl Into<String>,
        speech: impl Into<String>,
        advance_token: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            text: text.into(),
            speech: speech.into(),
            advance_token: advance_token.into(),
        }
    }

    /// First line of the lesson text, used to recognise it in a transcript
    pub fn heading(&self) -> &str {
        self.text.lines().next().unwrap_or_default()
    }

    /// Case-insensitive exact match against the advance token
    pub fn is_advance(&self, input: &str) -> bool {
        input.trim().eq_ignore_ascii_case(&self.advance_token)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurriculumError {
    #[error("Curriculum must contain at least one lesson")]
    Empty,
    #[error("Lesson {index} has an empty advance token")]
    MissingToken { index: usize },
    #[error("Lesson {index} has no text")]
    MissingText { index: usize },
}

/// Ordered, non-empty lesson sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCurriculum")]
pub struct Curriculum {
    lessons: Vec<Lesson>,
}

/// Unchecked wire form; goes through `Curriculum::new` on load
#[derive(Deserialize)]
struct RawCurriculum {
    lessons: Vec<Lesson>,
}

impl TryFrom<RawCurriculum> for Curriculum {
    type Error = CurriculumError;

    fn try_from(raw: RawCurriculum) -> Result<Self, Self::Error> {
        Self::new(raw.lessons)
    }
}

impl Curriculum {
    pub fn new(lessons: Vec<Lesson>) -> Result<Self, CurriculumError> {
        if lessons.is_empty() {
            return Err(CurriculumError::Empty);
        }
        if let Some(index) = lessons
            .iter()
            .position(|lesson| lesson.advance_token.trim().is_empty())
        {
            return Err(CurriculumError::MissingToken { index });
        }
        // The heading identifies a posted lesson, so it must not be blank
        if let Some(index) = lessons
            .iter()
            .position(|lesson| lesson.heading().trim().is_empty())
        {
            return Err(CurriculumError::MissingText { index });
        }
        Ok(Self { lessons })
    }

    /// The three-lesson Hindi primer shown by the academy widget
    pub fn hindi_basics() -> Self {
        Self {
            lessons: vec![
                Lesson::new(
                    "Numbers (1 to 5)",
                    "**Lesson 1: Numbers (1-5)**\n\n1: **Ek** (एक)\n2: **Do** (दो)\n3: **Teen** (तीन)\n4: **Chaar** (चार)\n5: **Paanch** (पाँच)\n\nType **NEXT** to learn the Days of the Week.",
                    "Here is your first lesson on numbers one to five.",
                    "NEXT",
                ),
                Lesson::new(
                    "Days of the Week",
                    "**Lesson 2: Days of the Week**\n\nMonday: **Somvaar** (सोमवार)\nTuesday: **Mangalvaar** (मंगलवार)\nWednesday: **Budhvaar** (बुधवार)\n\nType **NEXT** to learn the Months.",
                    "Lesson two is the days of the week.",
                    "NEXT",
                ),
                Lesson::new(
                    "Months",
                    "**Lesson 3: Common Months**\n\nJanuary: **Janvari** (जनवरी)\nFebruary: **Farvari** (फ़रवरी)\nMarch: **March** (मार्च)\n\nThat completes your guided lessons for now! Please type **DONE**.",
                    "Lesson three covers some common months.",
                    "DONE",
                ),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn first(&self) -> &Lesson {
        &self.lessons[0]
    }

    /// Lesson under the cursor. The cursor is clamped so this never panics.
    pub fn lesson_at(&self, cursor: LessonCursor) -> &Lesson {
        let index = cursor.index().min(self.lessons.len() - 1);
        &self.lessons[index]
    }

    pub fn is_last(&self, cursor: LessonCursor) -> bool {
        cursor.index() + 1 >= self.lessons.len()
    }
}

impl Default for Curriculum {
    fn default() -> Self {
        Self::hindi_basics()
    }
}

/// Index into the curriculum. Only moves forward, one lesson at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCursor(usize);

impl LessonCursor {
    pub fn index(self) -> usize {
        self.0
    }

    pub fn is_start(self) -> bool {
        self.0 == 0
    }

    /// Next position, or `None` when the cursor already sits on the last lesson
    pub fn advance(self, curriculum: &Curriculum) -> Option<Self> {
        if curriculum.is_last(self) {
            None
        } else {
            Some(Self(self.0 + 1))
        }
    }
}
