use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KeyValue<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for KeyValue<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.key, self.value)
    }
}

/// All values emitted under one key, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K, V> {
    pub key: K,
    pub values: Vec<V>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_value_orders_by_key_first() {
        let a = KeyValue::new("a", 9);
        let b = KeyValue::new("b", 1);
        assert!(a < b);
        assert!(KeyValue::new("a", 1) < a);
    }

    #[test]
    fn test_key_value_display_is_tab_separated() {
        assert_eq!(KeyValue::new("20", "00001").to_string(), "20\t00001");
    }
}
