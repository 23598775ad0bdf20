//! String-to-term-id dictionary: dense, monotonic, permanent ids, no deletion.

use ahash::AHashMap;

pub struct Dictionary {
    ids: AHashMap<Box<str>, u32>,
    terms: Vec<Box<str>>,
}

impl Dictionary {
    pub fn new() -> Self {
        Dictionary {
            ids: AHashMap::new(),
            terms: Vec::new(),
        }
    }

    /// Returns the existing id for `term`, or assigns `next_id` and returns it. The caller is
    /// expected to advance its own counter exactly when the returned id equals `next_id`.
    pub fn intern(&mut self, term: &str, next_id: u32) -> u32 {
        if let Some(&id) = self.ids.get(term) {
            return id;
        }
        self.ids.insert(term.into(), next_id);
        self.terms.push(term.into());
        next_id
    }

    pub fn lookup(&self, term: &str) -> Option<u32> {
        self.ids.get(term).copied()
    }

    pub fn term_for(&self, id: u32) -> Option<&str> {
        self.terms.get(id as usize).map(|s| s.as_ref())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn write<W: std::io::Write>(&self, w: &mut W) -> crate::error::Result<()> {
        use crate::utils::{write_string, write_u32};
        write_u32(w, self.terms.len() as u32)?;
        for term in &self.terms {
            write_string(w, term)?;
        }
        Ok(())
    }

    pub fn read<R: std::io::Read>(r: &mut R) -> crate::error::Result<Self> {
        use crate::utils::{read_string, read_u32};
        let count = read_u32(r)? as usize;
        let mut terms = Vec::with_capacity(count);
        let mut ids = AHashMap::with_capacity(count);
        for id in 0..count as u32 {
            let term: Box<str> = read_string(r)?.into();
            ids.insert(term.clone(), id);
            terms.push(term);
        }
        Ok(Dictionary { ids, terms })
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}
