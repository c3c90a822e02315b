//! Natural ordering of platform identifiers, so that `K64F[2]` sorts before
//! `K64F[10]`.

use std::cmp::Ordering;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Chunk {
    Number(u64),
    Text(String),
}

fn key(s: &str) -> Vec<Chunk> {
    let mut chunks = vec![];
    let mut rest = s;
    while let Some(first) = rest.chars().next() {
        let digits = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digits)
            .unwrap_or_else(|| rest.len());
        let (head, tail) = rest.split_at(end);
        chunks.push(match head.parse::<u64>() {
            Ok(n) if digits => Chunk::Number(n),
            _ => Chunk::Text(head.to_lowercase()),
        });
        rest = tail;
    }
    chunks
}

pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    key(a).cmp(&key(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_by_value() {
        let mut names = vec!["K64F[10]", "k64f[2]", "EFM32GG_STK3700[0]", "K64F[1]"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            names,
            vec!["EFM32GG_STK3700[0]", "K64F[1]", "k64f[2]", "K64F[10]"]
        );
    }

    #[test]
    fn empty_and_equal() {
        assert_eq!(natural_cmp("", ""), Ordering::Equal);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
        assert_eq!(natural_cmp("NRF51_DK[0]", "NRF51_DK[0]"), Ordering::Equal);
    }
}
