// Handles smart text input parsing for the create prompt
use crate::model::item::{Priority, TaskDraft};

const DESCRIPTION_SEPARATOR: &str = " // ";

impl TaskDraft {
    /// Builds a draft from a single line such as `Buy milk !high // 2 litres`.
    ///
    /// `!low`, `!med`/`!medium`, `!high` and `!1`..`!3` (1 is highest) set the
    /// priority. Everything after ` // ` becomes the description. Remaining
    /// words form the title, which may end up empty; validation happens in
    /// the view-model.
    pub fn from_smart_input(input: &str) -> Self {
        let (head, description) = match input.split_once(DESCRIPTION_SEPARATOR) {
            Some((head, rest)) => {
                let rest = rest.trim();
                (head, (!rest.is_empty()).then(|| rest.to_string()))
            }
            None => (input, None),
        };

        let mut priority = None;
        let mut title_words = Vec::new();

        for word in head.split_whitespace() {
            if let Some(tag) = word.strip_prefix('!')
                && let Some(p) = parse_priority_token(tag)
            {
                priority = Some(p);
                continue;
            }
            title_words.push(word);
        }

        TaskDraft {
            title: title_words.join(" "),
            description,
            priority,
            status: None,
        }
    }
}

fn parse_priority_token(tag: &str) -> Option<Priority> {
    match tag {
        "1" => Some(Priority::High),
        "2" => Some(Priority::Medium),
        "3" => Some(Priority::Low),
        other => other.parse().ok(),
    }
}
