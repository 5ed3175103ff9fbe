//! Object names and identifiers
//!
//! Names are four ASCII characters packed into a `u32`. Identifiers carry
//! the object index plus the node, API and class they belong to:
//!
//! ```text
//!  31    27 26  24 23      16 15                0
//! +--------+------+----------+-------------------+
//! | class  | API  |   node   |       index       |
//! +--------+------+----------+-------------------+
//! ```

use core::fmt;

/// Four character object name
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

impl Name {
    /// Build a name from four characters
    pub const fn build(c1: u8, c2: u8, c3: u8, c4: u8) -> Self {
        Self(((c1 as u32) << 24) | ((c2 as u32) << 16) | ((c3 as u32) << 8) | (c4 as u32))
    }

    pub const fn from_bytes(bytes: &[u8; 4]) -> Self {
        Self::build(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name(\"{}\")", self)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes() {
            let c = if byte.is_ascii_graphic() || byte == b' ' { byte as char } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

pub const INDEX_START_BIT: u32 = 0;
pub const NODE_START_BIT: u32 = 16;
pub const API_START_BIT: u32 = 24;
pub const CLASS_START_BIT: u32 = 27;

pub const INDEX_VALID_BITS: u32 = 0xffff;
pub const NODE_VALID_BITS: u32 = 0xff;
pub const API_VALID_BITS: u32 = 0x7;
pub const CLASS_VALID_BITS: u32 = 0x1f;

/// Node number of the local node
pub const LOCAL_NODE: u32 = 1;

/// Object API families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ObjectsApi {
    Internal = 1,
    Classic = 2,
    Posix = 3,
    /// Objects that live in static tables rather than an object information block
    Fake = 7,
}

/// Class of fake objects for scheduler instances
pub const FAKE_OBJECTS_SCHEDULERS: u32 = 1;

/// Packed object identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u32);

impl ObjectId {
    pub const fn build(api: ObjectsApi, class: u32, node: u32, index: u32) -> Self {
        Self(
            ((class & CLASS_VALID_BITS) << CLASS_START_BIT)
                | (((api as u32) & API_VALID_BITS) << API_START_BIT)
                | ((node & NODE_VALID_BITS) << NODE_START_BIT)
                | ((index & INDEX_VALID_BITS) << INDEX_START_BIT),
        )
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> u32 {
        (self.0 >> INDEX_START_BIT) & INDEX_VALID_BITS
    }

    pub const fn node(self) -> u32 {
        (self.0 >> NODE_START_BIT) & NODE_VALID_BITS
    }

    pub const fn api(self) -> u32 {
        (self.0 >> API_START_BIT) & API_VALID_BITS
    }

    pub const fn class(self) -> u32 {
        (self.0 >> CLASS_START_BIT) & CLASS_VALID_BITS
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#010x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
