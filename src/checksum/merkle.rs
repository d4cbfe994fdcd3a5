use serde_json::Value;
use crate::dataset::canonical_record;
use crate::error::Result;
use super::sha256;

pub fn leaf_hashes(records: &[Value]) -> Result<Vec<String>> {
    records
        .iter()
        .map(|record| canonical_record(record).map(|s| sha256(&s)))
        .collect()
}

/// Every level of the tree, leaves first and root last.
///
/// An odd node at any level is paired with itself. An empty input yields a
/// single level holding `H("")`.
pub fn merkle_levels(records: &[Value]) -> Result<Vec<Vec<String>>> {
    let leaves = leaf_hashes(records)?;
    if leaves.is_empty() {
        return Ok(vec![vec![sha256("")]]);
    }

    let mut levels = vec![leaves];
    while levels.last().map(|l| l.len()).unwrap_or(0) > 1 {
        let current = &levels[levels.len() - 1];
        let next: Vec<String> = current
            .chunks(2)
            .map(|pair| {
                let left = &pair[0];
                let right = pair.get(1).unwrap_or(left);
                sha256(&format!("{}{}", left, right))
            })
            .collect();
        levels.push(next);
    }

    Ok(levels)
}

pub fn merkle_root(records: &[Value]) -> Result<String> {
    let levels = merkle_levels(records)?;
    Ok(levels
        .last()
        .and_then(|level| level.first())
        .cloned()
        .unwrap_or_else(|| sha256("")))
}

/// Indices whose leaf hashes differ, including indices present on one side only.
pub fn changed_leaves(before: &[Value], after: &[Value]) -> Result<Vec<usize>> {
    let before = leaf_hashes(before)?;
    let after = leaf_hashes(after)?;
    let len = before.len().max(after.len());

    Ok((0..len)
        .filter(|&i| before.get(i) != after.get(i))
        .collect())
}
