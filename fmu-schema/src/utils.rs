use std::{fmt::Display, str::FromStr};

/// Space-separated attribute list, as used by `dependencies` and `dependenciesKind`.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct AttrList<T>(pub Vec<T>);

impl<T: FromStr> FromStr for AttrList<T> {
    type Err = T::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_ascii_whitespace()
            .map(T::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(AttrList)
    }
}

impl<T: Display> Display for AttrList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for item in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}", item)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_list() {
        let list: AttrList<u32> = "1 2  3".parse().unwrap();
        assert_eq!(list.0, vec![1, 2, 3]);
        assert_eq!(AttrList(vec![4u32, 5]).to_string(), "4 5");
        assert!(AttrList::<u32>::from_str("").unwrap().0.is_empty());
    }
}
