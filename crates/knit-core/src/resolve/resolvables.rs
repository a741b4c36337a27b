//! Dense id-indexed table.
//!
//! Block ids are small, roughly dense integers, so objects are stored in
//! fixed-size buckets addressed by `id / 64`. Buckets are allocated on first
//! write; reads of any id never fail.

use crate::domain::BlockId;

const BUCKET_BITS: usize = 6;
pub const BUCKET_SIZE: usize = 1 << BUCKET_BITS;
const BUCKET_MASK: usize = BUCKET_SIZE - 1;

type Bucket<T> = Box<[Option<T>; BUCKET_SIZE]>;

pub struct Resolvables<T> {
    buckets: Vec<Option<Bucket<T>>>,
    len: usize,
}

impl<T> Resolvables<T> {
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            len: 0,
        }
    }

    /// Reserve bucket slots for ids `0..capacity` (buckets themselves stay lazy).
    pub fn with_capacity(capacity: usize) -> Self {
        let mut buckets = Vec::new();
        buckets.resize_with(capacity.div_ceil(BUCKET_SIZE), || None);
        Self { buckets, len: 0 }
    }

    /// Store `object` under `id`, returning the previous occupant.
    pub fn put(&mut self, id: BlockId, object: T) -> Option<T> {
        let (bucket, slot) = split(id);
        if bucket >= self.buckets.len() {
            self.buckets.resize_with(bucket + 1, || None);
        }
        let bucket = self.buckets[bucket].get_or_insert_with(new_bucket);
        let previous = bucket[slot].replace(object);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    pub fn get(&self, id: BlockId) -> Option<&T> {
        let (bucket, slot) = split(id);
        self.buckets.get(bucket)?.as_ref()?[slot].as_ref()
    }

    pub fn get_mut(&mut self, id: BlockId) -> Option<&mut T> {
        let (bucket, slot) = split(id);
        self.buckets.get_mut(bucket)?.as_mut()?[slot].as_mut()
    }

    pub fn take(&mut self, id: BlockId) -> Option<T> {
        let (bucket, slot) = split(id);
        let taken = self.buckets.get_mut(bucket)?.as_mut()?[slot].take();
        if taken.is_some() {
            self.len -= 1;
        }
        taken
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Occupied entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &T)> {
        self.buckets
            .iter()
            .enumerate()
            .filter_map(|(b, bucket)| bucket.as_ref().map(|bucket| (b, bucket)))
            .flat_map(|(b, bucket)| {
                bucket.iter().enumerate().filter_map(move |(s, slot)| {
                    slot.as_ref().map(|object| (join(b, s), object))
                })
            })
    }
}

impl<T> Default for Resolvables<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn new_bucket<T>() -> Bucket<T> {
    Box::new(std::array::from_fn(|_| None))
}

fn split(id: BlockId) -> (usize, usize) {
    let index = id.index();
    (index >> BUCKET_BITS, index & BUCKET_MASK)
}

fn join(bucket: usize, slot: usize) -> BlockId {
    BlockId::new(((bucket << BUCKET_BITS) | slot) as u32)
}
