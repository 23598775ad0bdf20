//! Optional per-document term-id streams ("document vectors"), indexed densely by docid.
//!
//! Growing the store must zero-initialize every newly added slot, not just the one being
//! written — a distilled precursor of this code (`expandDocumentVector`) reallocated the
//! backing array but left `tempLength` pointing nowhere, silently dropping the new tail.
//! This implementation grows through a safe `Vec::resize`, so every slot up to and including
//! the one being written is `None` before the write proceeds; there is no way to reproduce
//! that bug through this API.

pub struct DocumentVectors {
    vectors: Vec<Option<Box<[u32]>>>,
}

impl DocumentVectors {
    pub fn new() -> Self {
        DocumentVectors { vectors: Vec::new() }
    }

    pub fn set(&mut self, docid: u32, terms: Vec<u32>) {
        let idx = docid as usize;
        if idx >= self.vectors.len() {
            self.vectors.resize(idx + 1, None);
        }
        self.vectors[idx] = Some(terms.into_boxed_slice());
    }

    pub fn get(&self, docid: u32) -> Option<&[u32]> {
        self.vectors.get(docid as usize).and_then(|v| v.as_deref())
    }

    pub fn capacity(&self) -> usize {
        self.vectors.len()
    }

    pub fn write<W: std::io::Write>(&self, w: &mut W) -> crate::error::Result<()> {
        use crate::utils::{write_u32, write_u32_slice};
        write_u32(w, self.vectors.len() as u32)?;
        for (i, slot) in self.vectors.iter().enumerate() {
            if let Some(terms) = slot {
                write_u32(w, i as u32)?;
                write_u32(w, terms.len() as u32)?;
                write_u32_slice(w, terms)?;
            }
        }
        write_u32(w, u32::MAX)?;
        Ok(())
    }

    pub fn read<R: std::io::Read>(r: &mut R) -> crate::error::Result<Self> {
        use crate::utils::{read_u32, read_u32_vec};
        let capacity = read_u32(r)? as usize;
        let mut vectors: Vec<Option<Box<[u32]>>> = vec![None; capacity];
        loop {
            let i = read_u32(r)?;
            if i == u32::MAX {
                break;
            }
            let len = read_u32(r)? as usize;
            let data = read_u32_vec(r, len)?;
            if i as usize >= vectors.len() {
                vectors.resize(i as usize + 1, None);
            }
            vectors[i as usize] = Some(data.into_boxed_slice());
        }
        Ok(DocumentVectors { vectors })
    }
}

impl Default for DocumentVectors {
    fn default() -> Self {
        Self::new()
    }
}
