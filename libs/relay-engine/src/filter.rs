/// Что делать с записью после фильтра.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    /// Префикс совпал: логировать и переслать.
    Forward,
    /// Фильтр выключен: только логировать.
    Observe,
    /// Префикс не совпал: молча отбросить.
    Discard,
}

/// Фильтр подписки по префиксу topic'а. Задаётся один раз при старте.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionFilter {
    prefix: String,
}

impl SubscriptionFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn is_enabled(&self) -> bool {
        !self.prefix.is_empty()
    }

    /// Byte-wise, case-sensitive сравнение префикса.
    pub fn decide(&self, topic: &str) -> FilterDecision {
        if !self.is_enabled() {
            FilterDecision::Observe
        } else if topic.as_bytes().starts_with(self.prefix.as_bytes()) {
            FilterDecision::Forward
        } else {
            FilterDecision::Discard
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prefix_observes_everything() {
        let f = SubscriptionFilter::new("");
        assert!(!f.is_enabled());
        assert_eq!(f.decide("home/temp"), FilterDecision::Observe);
        assert_eq!(f.decide(""), FilterDecision::Observe);
    }

    #[test]
    fn prefix_match_forwards() {
        let f = SubscriptionFilter::new("home/");
        assert_eq!(f.decide("home/temp"), FilterDecision::Forward);
        assert_eq!(f.decide("office/temp"), FilterDecision::Discard);
    }

    #[test]
    fn prefix_equal_to_topic_matches() {
        let f = SubscriptionFilter::new("home/temp");
        assert_eq!(f.decide("home/temp"), FilterDecision::Forward);
        assert_eq!(f.decide("home/te"), FilterDecision::Discard);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let f = SubscriptionFilter::new("Home/");
        assert_eq!(f.decide("home/temp"), FilterDecision::Discard);
    }
}
