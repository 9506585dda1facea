use std::collections::HashMap;

/// A matched answer: what to say and, optionally, which body clip to play while saying it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub animation: Option<String>,
}

/// Q&A collaborator consulted by the engine before speaking.
pub trait AnswerLookup {
    /// `normalized` has already been passed through [`normalize_question`].
    fn lookup(&self, normalized: &str) -> Option<Answer>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
    pub animation: Option<String>,
}

/// Exact-match question table keyed by normalized question text.
#[derive(Clone, Debug, Default)]
pub struct QaTable {
    entries: Vec<QaEntry>,
    index: HashMap<String, usize>,
}

impl QaTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if an entry with the same normalized question already exists; the
    /// earlier entry keeps answering.
    ///
    /// An empty animation name is stored as `None`.
    pub fn insert(&mut self, mut entry: QaEntry) -> bool {
        entry.animation = entry.animation.filter(|a| !a.is_empty());
        let key = normalize_question(&entry.question);
        if self.index.contains_key(&key) {
            return false;
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[QaEntry] {
        &self.entries
    }

    /// Looks up raw, not yet normalized, question text.
    pub fn find(&self, question: &str) -> Option<&QaEntry> {
        let index = *self.index.get(&normalize_question(question))?;
        self.entries.get(index)
    }
}

impl FromIterator<QaEntry> for QaTable {
    fn from_iter<T: IntoIterator<Item = QaEntry>>(iter: T) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}

impl AnswerLookup for QaTable {
    fn lookup(&self, normalized: &str) -> Option<Answer> {
        let entry = self.entries.get(*self.index.get(normalized)?)?;
        Some(Answer {
            text: entry.answer.clone(),
            animation: entry.animation.clone().filter(|a| !a.is_empty()),
        })
    }
}

/// Lowercases, trims and strips everything except word characters and Turkish letters.
pub fn normalize_question(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || "şçöüğıi".contains(*c))
        .collect()
}
