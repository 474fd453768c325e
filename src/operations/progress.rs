use std::sync::Arc;

const FALLBACK_PHRASE: &str = "Procesando...";

/// Phrases shown while an operation runs. They rotate in order and say
/// nothing about the real remote progress.
#[derive(Debug, Clone)]
pub struct ProgressMessages {
    phrases: Arc<[String]>,
}

impl ProgressMessages {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
        }
    }

    pub fn phrase(&self, index: usize) -> &str {
        if self.phrases.is_empty() {
            return FALLBACK_PHRASE;
        }
        &self.phrases[index % self.phrases.len()]
    }
}

impl Default for ProgressMessages {
    fn default() -> Self {
        Self::new([
            "Renderizando frames...",
            "Aplicando leyes de física visual...",
            "Codificando MP4...",
            "Finalizando texturas...",
            "Casi listo...",
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrases_wrap_around() {
        let messages = ProgressMessages::new(["a", "b", "c"]);
        let seen: Vec<_> = (0..5).map(|i| messages.phrase(i).to_string()).collect();
        assert_eq!(seen, ["a", "b", "c", "a", "b"]);
    }

    #[test]
    fn empty_list_falls_back() {
        let messages = ProgressMessages::new(Vec::<String>::new());
        assert_eq!(messages.phrase(7), FALLBACK_PHRASE);
    }
}
