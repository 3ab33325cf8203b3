use alloc::vec::Vec;
use core::{fmt, marker::PhantomData};

use serde::{de, ser::SerializeTuple, Deserialize, Deserializer, Serialize, Serializer};

use crate::{allocator::RawAllocator, ManagedHandle};

// A handle is serialized as a `(header, elements)` tuple; the capacity is not preserved.
impl<H: Serialize, T: Serialize, A: RawAllocator> Serialize for ManagedHandle<H, T, A> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.header())?;
        tuple.serialize_element(self.as_slice())?;
        tuple.end()
    }
}

struct ManagedHandleVisitor<H, T>(PhantomData<fn() -> (H, T)>);

impl<'de, H: Deserialize<'de>, T: Deserialize<'de>> de::Visitor<'de>
    for ManagedHandleVisitor<H, T>
{
    type Value = ManagedHandle<H, T>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a header followed by a sequence of elements")
    }

    fn visit_seq<V>(self, mut seq: V) -> Result<Self::Value, V::Error>
    where
        V: de::SeqAccess<'de>,
    {
        let header: H = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let elements: Vec<T> = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let mut handle = ManagedHandle::try_new(elements.len(), |_| header)
            .map_err(de::Error::custom)?;
        let buffer = handle.get_mut().ok_or_else(|| de::Error::custom("shared buffer"))?;
        for element in elements {
            buffer.push(element);
        }
        Ok(handle)
    }
}

impl<'de, H: Deserialize<'de>, T: Deserialize<'de>> Deserialize<'de> for ManagedHandle<H, T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_tuple(2, ManagedHandleVisitor(PhantomData))
    }
}
