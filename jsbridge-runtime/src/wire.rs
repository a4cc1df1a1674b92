// Wire codec for type records sent to the engine at registration time.
//
// Layout (little-endian, all integers 16-bit):
//
//   kind/flags   registration id of the type in its context
//   reserved     0
//   name         unit count + UTF-16 units
//   fields       count, then per member: flags (0), id, name
//   methods      same
//   properties   same
//
// Accessor sub-members of fields and properties are not encoded; the engine
// reaches them through the owning member's id and the access mode.

use serde::Serialize;

use crate::error::{BridgeResult, ValidationError};
use crate::member::{MemberKind, TypeMember};
use crate::type_def::TypeDefinition;

/// Longest name, in UTF-16 units, a record may carry.
pub const MAX_NAME_UNITS: usize = i16::MAX as usize;

/// Largest member count per collection.
pub const MAX_COLLECTION_LEN: usize = i16::MAX as usize;

/// Serialize `def` for the engine. All names and counts are validated before
/// any byte is produced.
pub fn encode_type_definition(def: &TypeDefinition, type_id: u16) -> BridgeResult<Vec<u8>> {
    let name = utf16_checked(def.name())?;
    let fields = collection(def.name(), def.fields())?;
    let methods = collection(def.name(), def.methods())?;
    let properties = collection(def.name(), def.properties())?;

    let units: usize = name.len()
        + [&fields, &methods, &properties]
            .iter()
            .flat_map(|c| c.iter())
            .map(|(_, n)| n.len() + 3)
            .sum::<usize>();
    let mut out = Vec::with_capacity(2 * (units + 6));

    put_u16(&mut out, type_id);
    put_u16(&mut out, 0);
    put_name(&mut out, &name);
    for members in [&fields, &methods, &properties] {
        put_u16(&mut out, members.len() as u16);
        for (id, name) in members {
            put_u16(&mut out, 0);
            put_u16(&mut out, *id);
            put_name(&mut out, name);
        }
    }
    Ok(out)
}

fn utf16_checked(name: &str) -> Result<Vec<u16>, ValidationError> {
    let units: Vec<u16> = name.encode_utf16().collect();
    if units.len() > MAX_NAME_UNITS {
        return Err(ValidationError::NameTooLong {
            preview: name.chars().take(16).collect(),
            units: units.len(),
            limit: MAX_NAME_UNITS,
        });
    }
    Ok(units)
}

fn collection<M: TypeMember>(
    owner: &str,
    members: &[M],
) -> Result<Vec<(u16, Vec<u16>)>, ValidationError> {
    if members.len() > MAX_COLLECTION_LEN {
        return Err(ValidationError::TooManyMembers {
            owner: owner.to_owned(),
            count: members.len(),
            limit: MAX_COLLECTION_LEN,
        });
    }
    members
        .iter()
        .map(|m| Ok((m.member_id().0, utf16_checked(m.name())?)))
        .collect()
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_name(out: &mut Vec<u8>, units: &[u16]) {
    put_u16(out, units.len() as u16);
    for u in units {
        put_u16(out, *u);
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// One encoded member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberRecord {
    pub flags: u16,
    pub id: u16,
    pub name: String,
}

/// A decoded type record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TypeRecord {
    pub type_id: u16,
    pub reserved: u16,
    pub name: String,
    pub fields: Vec<MemberRecord>,
    pub methods: Vec<MemberRecord>,
    pub properties: Vec<MemberRecord>,
}

impl TypeRecord {
    /// `(kind, id, name)` triples in encoding order.
    pub fn entries(&self) -> Vec<(MemberKind, u16, &str)> {
        self.fields
            .iter()
            .map(|m| (MemberKind::Field, m.id, m.name.as_str()))
            .chain(self.methods.iter().map(|m| (MemberKind::Method, m.id, m.name.as_str())))
            .chain(self.properties.iter().map(|m| (MemberKind::Property, m.id, m.name.as_str())))
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<(MemberKind, u16)> {
        self.entries()
            .into_iter()
            .find(|(_, _, n)| *n == name)
            .map(|(kind, id, _)| (kind, id))
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn u16(&mut self) -> Result<u16, ValidationError> {
        let end = self.pos + 2;
        let chunk = self.bytes.get(self.pos..end).ok_or_else(|| {
            ValidationError::MalformedRecord(format!("truncated at byte {}", self.pos))
        })?;
        self.pos = end;
        Ok(u16::from_le_bytes([chunk[0], chunk[1]]))
    }

    fn name(&mut self) -> Result<String, ValidationError> {
        let len = self.u16()? as usize;
        let units = (0..len).map(|_| self.u16()).collect::<Result<Vec<_>, _>>()?;
        String::from_utf16(&units).map_err(|_| {
            ValidationError::MalformedRecord(format!(
                "invalid UTF-16 in name ending at byte {}",
                self.pos
            ))
        })
    }

    fn members(&mut self) -> Result<Vec<MemberRecord>, ValidationError> {
        let count = self.u16()? as usize;
        (0..count)
            .map(|_| {
                Ok(MemberRecord {
                    flags: self.u16()?,
                    id: self.u16()?,
                    name: self.name()?,
                })
            })
            .collect()
    }
}

/// Parse a record produced by [`encode_type_definition`].
pub fn decode_type_record(bytes: &[u8]) -> BridgeResult<TypeRecord> {
    let mut r = Reader { bytes, pos: 0 };
    let record = TypeRecord {
        type_id: r.u16()?,
        reserved: r.u16()?,
        name: r.name()?,
        fields: r.members()?,
        methods: r.members()?,
        properties: r.members()?,
    };
    if r.pos != bytes.len() {
        return Err(ValidationError::MalformedRecord(format!(
            "{} trailing bytes",
            bytes.len() - r.pos
        ))
        .into());
    }
    Ok(record)
}
