/// Index-addressed storage. Removed slots are recycled by later inserts, so an index handed
/// out by [`Slab::insert`] stays valid until the value is removed again.
#[derive(Debug)]
pub(crate) struct Slab<T> {
    len: usize,
    free: Vec<usize>,
    slots: Vec<Option<T>>,
}

impl<T> Slab<T> {
    pub(crate) fn new() -> Slab<T> {
        Slab {
            len: 0,
            free: Vec::new(),
            slots: Vec::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Stores the value in a free slot and returns its index.
    pub(crate) fn insert(&mut self, value: T) -> usize {
        self.len += 1;

        // slots   [S N S S ]      free [1]
        //            |
        // slots   [S S S S ]      free []
        if let Some(index) = self.free.pop() {
            self.slots[index] = Some(value);
            return index;
        }

        self.slots.push(Some(value));
        self.slots.len() - 1
    }

    /// Takes the value out of the slot and marks the slot as free.
    ///
    /// Returns [None] if the slot is out of bounds or already free.
    pub(crate) fn remove(&mut self, index: usize) -> Option<T> {
        let value = self.slots.get_mut(index)?.take()?;
        self.len -= 1;
        self.free.push(index);
        Some(value)
    }

    pub(crate) fn clear(&mut self) {
        self.len = 0;
        self.free.clear();
        self.slots.clear();
    }
}
