// TypeDefinition: the sealed, script-visible shape of a host type.

use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{BridgeResult, ValidationError};
use crate::member::{FieldMember, MemberId, MemberKind, MethodMember, PropertyMember, TypeMember};

/// Largest number of members a type may declare; ids are 16-bit.
pub const MAX_MEMBERS: usize = u16::MAX as usize;

/// Assign member ids in serialization order: one running counter over the
/// given `(kind, name)` sequence, starting at zero.
pub fn assign_member_ids<'a, I>(members: I) -> Vec<(MemberKind, &'a str, MemberId)>
where
    I: IntoIterator<Item = (MemberKind, &'a str)>,
{
    members
        .into_iter()
        .enumerate()
        .map(|(index, (kind, name))| (kind, name, MemberId(index as u16)))
        .collect()
}

/// A sealed type definition. Members are immutable once built, except for
/// late accessor attachment on blank properties.
pub struct TypeDefinition {
    name: String,
    fields: Vec<FieldMember>,
    methods: Vec<MethodMember>,
    properties: Vec<PropertyMember>,
}

/// A borrowed view of one member of a definition.
#[derive(Clone, Copy, Debug)]
pub enum MemberRef<'a> {
    Field(&'a FieldMember),
    Method(&'a MethodMember),
    Property(&'a PropertyMember),
}

impl<'a> MemberRef<'a> {
    pub fn as_member(&self) -> &'a dyn TypeMember {
        match *self {
            MemberRef::Field(f) => f,
            MemberRef::Method(m) => m,
            MemberRef::Property(p) => p,
        }
    }

    pub fn name(&self) -> &'a str {
        match *self {
            MemberRef::Field(f) => f.name(),
            MemberRef::Method(m) => m.name(),
            MemberRef::Property(p) => p.name(),
        }
    }

    pub fn kind(&self) -> MemberKind {
        self.as_member().kind()
    }

    pub fn member_id(&self) -> MemberId {
        self.as_member().member_id()
    }
}

impl TypeDefinition {
    pub fn builder(name: impl Into<String>) -> TypeDefinitionBuilder {
        TypeDefinitionBuilder::new(name)
    }

    /// A definition with no members, used to carry otherwise undescribed
    /// host objects through script.
    pub fn opaque(type_name: &str) -> BridgeResult<Rc<TypeDefinition>> {
        TypeDefinitionBuilder::new(type_name).build()
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> MemberKind {
        MemberKind::Type
    }

    pub fn fields(&self) -> &[FieldMember] {
        &self.fields
    }

    pub fn methods(&self) -> &[MethodMember] {
        &self.methods
    }

    pub fn properties(&self) -> &[PropertyMember] {
        &self.properties
    }

    pub fn member_count(&self) -> usize {
        self.fields.len() + self.methods.len() + self.properties.len()
    }

    /// Members in serialization order.
    pub fn members(&self) -> impl Iterator<Item = MemberRef<'_>> {
        self.fields
            .iter()
            .map(MemberRef::Field)
            .chain(self.methods.iter().map(MemberRef::Method))
            .chain(self.properties.iter().map(MemberRef::Property))
    }

    /// Look a member up by id. Ids are dense, so this is an index.
    pub fn member(&self, id: MemberId) -> Option<MemberRef<'_>> {
        let mut index = id.0 as usize;
        if index < self.fields.len() {
            return Some(MemberRef::Field(&self.fields[index]));
        }
        index -= self.fields.len();
        if index < self.methods.len() {
            return Some(MemberRef::Method(&self.methods[index]));
        }
        index -= self.methods.len();
        self.properties.get(index).map(MemberRef::Property)
    }

    pub fn find(&self, name: &str) -> Option<MemberRef<'_>> {
        self.members().find(|m| m.name() == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodMember> {
        self.methods.iter().find(|m| m.name() == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMember> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldMember> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("name", &self.name)
            .field("fields", &self.fields.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("methods", &self.methods.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("properties", &self.properties.iter().map(|m| m.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Collects detached members; `build()` validates and seals them.
pub struct TypeDefinitionBuilder {
    name: String,
    fields: Vec<FieldMember>,
    methods: Vec<MethodMember>,
    properties: Vec<PropertyMember>,
}

impl TypeDefinitionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        TypeDefinitionBuilder {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldMember) -> Self {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodMember) -> Self {
        self.methods.push(method);
        self
    }

    pub fn property(mut self, property: PropertyMember) -> Self {
        self.properties.push(property);
        self
    }

    pub fn add_field(&mut self, field: FieldMember) -> &mut Self {
        self.fields.push(field);
        self
    }

    pub fn add_method(&mut self, method: MethodMember) -> &mut Self {
        self.methods.push(method);
        self
    }

    pub fn add_property(&mut self, property: PropertyMember) -> &mut Self {
        self.properties.push(property);
        self
    }

    fn layout(&self) -> impl Iterator<Item = (MemberKind, &str)> {
        self.fields
            .iter()
            .map(|m| (m.kind(), m.name()))
            .chain(self.methods.iter().map(|m| (m.kind(), m.name())))
            .chain(self.properties.iter().map(|m| (m.kind(), m.name())))
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName {
                owner: "<type>".into(),
            });
        }
        let count = self.fields.len() + self.methods.len() + self.properties.len();
        if count > MAX_MEMBERS {
            return Err(ValidationError::TooManyMembers {
                owner: self.name.clone(),
                count,
                limit: MAX_MEMBERS,
            });
        }
        let mut seen = HashSet::with_capacity(count);
        for (_, name) in self.layout() {
            if name.is_empty() {
                return Err(ValidationError::EmptyName {
                    owner: self.name.clone(),
                });
            }
            if !seen.insert(name) {
                return Err(ValidationError::DuplicateName {
                    owner: self.name.clone(),
                    name: name.to_owned(),
                });
            }
        }
        self.bound_methods().try_for_each(MethodMember::check_defaults)
    }

    /// Every method a call can land on, accessors included.
    fn bound_methods(&self) -> impl Iterator<Item = &MethodMember> {
        let fields = self.fields.iter().flat_map(|f| f.getter().into_iter().chain(f.setter()));
        let properties = self
            .properties
            .iter()
            .flat_map(|p| p.getter().into_iter().chain(p.setter()));
        fields.chain(self.methods.iter()).chain(properties)
    }

    /// Validate, assign member ids and seal every member into the new
    /// definition.
    pub fn build(self) -> BridgeResult<Rc<TypeDefinition>> {
        self.validate()?;
        let ids: Vec<MemberId> = assign_member_ids(self.layout())
            .into_iter()
            .map(|(_, _, id)| id)
            .collect();

        let TypeDefinitionBuilder {
            name,
            mut fields,
            mut methods,
            mut properties,
        } = self;

        let definition = Rc::new_cyclic(|owner: &Weak<TypeDefinition>| {
            let mut ids = ids.into_iter();
            for (field, id) in fields.iter_mut().zip(ids.by_ref()) {
                field.seal(id, owner);
            }
            for (method, id) in methods.iter_mut().zip(ids.by_ref()) {
                method.seal(id, owner);
            }
            for (property, id) in properties.iter_mut().zip(ids.by_ref()) {
                property.seal(id, owner);
            }
            TypeDefinition {
                name,
                fields,
                methods,
                properties,
            }
        });
        log::trace!(
            "sealed type `{}` with {} members",
            definition.name(),
            definition.member_count()
        );
        Ok(definition)
    }
}
