//! Short ids for source file names in the persisted model.

use std::collections::{BTreeMap, HashMap};

const BASE62_DIGITS: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub fn base62_encode(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE62_DIGITS[(value % 62) as usize]);
        value /= 62;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

pub fn base62_decode(text: &str) -> Option<u64> {
    let mut value: u64 = 0;
    for c in text.bytes() {
        let digit = BASE62_DIGITS.iter().position(|&d| d == c)? as u64;
        value = value.checked_mul(62)?.checked_add(digit)?;
    }
    Some(value)
}

/// Bidirectional source name <-> short id table (`s` + base62 counter)
///
/// Ids are never renumbered: adopting a loaded table keeps its ids and new
/// names continue after the largest id seen.
#[derive(Debug, Clone, Default)]
pub struct SrcIdTable {
    ids_by_name: BTreeMap<String, String>,
    names_by_id: HashMap<String, String>,
    next: u64,
}

impl SrcIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for a source name, assigning the next one if it has none
    pub fn get_or_assign(&mut self, src_name: &str) -> String {
        if let Some(id) = self.ids_by_name.get(src_name) {
            return id.clone();
        }
        let id = format!("s{}", base62_encode(self.next));
        self.next += 1;
        self.put(src_name, &id);
        id
    }

    pub fn id_of(&self, src_name: &str) -> Option<&str> {
        self.ids_by_name.get(src_name).map(String::as_str)
    }

    pub fn name_of(&self, src_id: &str) -> Option<&str> {
        self.names_by_id.get(src_id).map(String::as_str)
    }

    /// Adopt an existing name/id pair
    pub fn put(&mut self, src_name: &str, src_id: &str) {
        if let Some(n) = src_id.strip_prefix('s').and_then(base62_decode) {
            self.next = self.next.max(n + 1);
        }
        self.ids_by_name.insert(src_name.to_string(), src_id.to_string());
        self.names_by_id.insert(src_id.to_string(), src_name.to_string());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids_by_name.iter().map(|(name, id)| (name.as_str(), id.as_str()))
    }
}
