/// Allocates and recycles bindless descriptor slots.
///
/// A bindless texture table is a fixed-size descriptor array; each resident
/// texture occupies one index. Freed indices are recycled LIFO so the table
/// stays dense. The allocator is bounded: once `capacity` slots are live,
/// `alloc` returns `None` and the caller reports an allocation failure.
///
/// # Example
///
/// ```ignore
/// let mut slots = SlotAllocator::with_capacity(2);
/// let a = slots.alloc();  // Some(0)
/// let b = slots.alloc();  // Some(1)
/// slots.alloc();           // None, table full
/// slots.free(0);
/// let c = slots.alloc();  // Some(0) (recycled)
/// ```
#[derive(Debug)]
pub struct SlotAllocator {
    free_list: Vec<u32>,
    next_id: u32,
    len: u32,
    capacity: u32,
}

impl SlotAllocator {
    /// Create an allocator handing out indices in `0..capacity`
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            free_list: Vec::new(),
            next_id: 0,
            len: 0,
            capacity,
        }
    }

    /// Allocate the next available slot, or `None` when every slot is live
    pub fn alloc(&mut self) -> Option<u32> {
        let id = match self.free_list.pop() {
            Some(id) => id,
            None if self.next_id < self.capacity => {
                let id = self.next_id;
                self.next_id += 1;
                id
            }
            None => return None,
        };
        self.len += 1;
        Some(id)
    }

    /// Return a slot to the pool for reuse
    ///
    /// Returns `false` (and changes nothing) if the slot is not currently
    /// allocated, so a double release can never hand one index to two textures.
    pub fn free(&mut self, id: u32) -> bool {
        if id >= self.next_id || self.free_list.contains(&id) {
            return false;
        }
        self.len -= 1;
        self.free_list.push(id);
        true
    }

    /// Highest index ever allocated + 1.
    ///
    /// Descriptor writes never touch indices at or above this mark.
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    /// Maximum number of simultaneously live slots
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of currently allocated slots
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether no slots are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether every slot is live
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
