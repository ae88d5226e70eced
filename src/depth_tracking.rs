use crate::{
    element::Element,
    error::{Error, Result},
    MAX_DEPTH,
};

/// Tracks how deeply nested the elements coming out of a parser are.
#[derive(Clone, Debug, Default)]
pub struct DepthTracker {
    tracking: Vec<u32>,
}

impl DepthTracker {
    /// Create a new depth tracker
    pub fn new() -> Self {
        Self {
            tracking: Vec::new(),
        }
    }

    /// Update the depth tracker on each new element.
    pub fn update_elem(&mut self, elem: &Element) -> Result<()> {
        // Subtract from count for next element
        if let Some(v) = self.tracking.last_mut() {
            *v -= 1;
        }

        match elem {
            Element::Map(len) => self.tracking.push(2 * (*len as u32)), // 2 elements per map item
            Element::Array(len) => self.tracking.push(*len as u32),
            _ => (),
        }

        if self.tracking.len() > MAX_DEPTH {
            return Err(Error::ParseLimit("Depth limit exceeded".to_string()));
        }

        self.purge_zeros();
        Ok(())
    }

    /// Drop any depth tracking elements that have hit zero
    fn purge_zeros(&mut self) {
        while let Some(0) = self.tracking.last() {
            self.tracking.pop();
        }
    }
}
