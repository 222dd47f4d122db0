use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderlink_core::{Aggregate, AggregateId, AggregateRoot, CompanyId, DomainError};
use orderlink_events::Event;

/// Party identifier (company-scoped via `company_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub AggregateId);

impl PartyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

/// Aggregate root: Party (customer or vendor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    id: PartyId,
    company_id: Option<CompanyId>,
    kind: PartyKind,
    name: String,
    key: Option<String>,
    version: u64,
    created: bool,
}

impl Party {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PartyId) -> Self {
        Self {
            id,
            company_id: None,
            kind: PartyKind::Customer,
            name: String::new(),
            key: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartyId {
        self.id
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn kind(&self) -> PartyKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable lookup key, unique per company (e.g. `generic_vendor`).
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }
}

impl AggregateRoot for Party {
    type Id = PartyId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterParty.
///
/// Key uniqueness is a store-level concern; the book checks it before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterParty {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub key: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RenameParty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameParty {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyCommand {
    RegisterParty(RegisterParty),
    RenameParty(RenameParty),
}

/// Event: PartyRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRegistered {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub key: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PartyRenamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRenamed {
    pub company_id: CompanyId,
    pub party_id: PartyId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyEvent {
    PartyRegistered(PartyRegistered),
    PartyRenamed(PartyRenamed),
}

impl Event for PartyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartyEvent::PartyRegistered(_) => "parties.party.registered",
            PartyEvent::PartyRenamed(_) => "parties.party.renamed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartyEvent::PartyRegistered(e) => e.occurred_at,
            PartyEvent::PartyRenamed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Party {
    type Command = PartyCommand;
    type Event = PartyEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartyEvent::PartyRegistered(e) => {
                self.id = e.party_id;
                self.company_id = Some(e.company_id);
                self.kind = e.kind;
                self.name = e.name.clone();
                self.key = e.key.clone();
                self.created = true;
            }
            PartyEvent::PartyRenamed(e) => {
                self.name = e.name.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartyCommand::RegisterParty(cmd) => self.handle_register(cmd),
            PartyCommand::RenameParty(cmd) => self.handle_rename(cmd),
        }
    }
}

impl Party {
    fn ensure_company(&self, company_id: CompanyId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.company_id != Some(company_id) {
            return Err(DomainError::invariant("company mismatch"));
        }
        Ok(())
    }

    fn ensure_party_id(&self, party_id: PartyId) -> Result<(), DomainError> {
        if self.id != party_id {
            return Err(DomainError::invariant("party_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterParty) -> Result<Vec<PartyEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("party already exists"));
        }

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        if cmd.key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            return Err(DomainError::validation("party key cannot be blank"));
        }

        Ok(vec![PartyEvent::PartyRegistered(PartyRegistered {
            company_id: cmd.company_id,
            party_id: cmd.party_id,
            kind: cmd.kind,
            name: cmd.name.trim().to_string(),
            key: cmd.key.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rename(&self, cmd: &RenameParty) -> Result<Vec<PartyEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_company(cmd.company_id)?;
        self.ensure_party_id(cmd.party_id)?;

        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(vec![PartyEvent::PartyRenamed(PartyRenamed {
            company_id: cmd.company_id,
            party_id: cmd.party_id,
            name: cmd.name.trim().to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_company_id() -> CompanyId {
        CompanyId::new()
    }

    fn test_party_id() -> PartyId {
        PartyId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn register(company_id: CompanyId, party_id: PartyId, key: Option<&str>) -> Party {
        let mut party = Party::empty(party_id);
        let cmd = RegisterParty {
            company_id,
            party_id,
            kind: PartyKind::Supplier,
            name: "Generic Vendor".to_string(),
            key: key.map(str::to_string),
            occurred_at: test_time(),
        };
        let events = party.handle(&PartyCommand::RegisterParty(cmd)).unwrap();
        for e in &events {
            party.apply(e);
        }
        party
    }

    #[test]
    fn register_party_sets_key_and_kind() {
        let company_id = test_company_id();
        let party_id = test_party_id();
        let party = register(company_id, party_id, Some("generic_vendor"));

        assert!(party.is_created());
        assert_eq!(party.company_id(), Some(company_id));
        assert_eq!(party.kind(), PartyKind::Supplier);
        assert_eq!(party.key(), Some("generic_vendor"));
        assert_eq!(party.version(), 1);
    }

    #[test]
    fn register_party_rejects_empty_name() {
        let party = Party::empty(test_party_id());
        let cmd = RegisterParty {
            company_id: test_company_id(),
            party_id: test_party_id(),
            kind: PartyKind::Customer,
            name: "   ".to_string(),
            key: None,
            occurred_at: test_time(),
        };

        let err = party.handle(&PartyCommand::RegisterParty(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn register_party_rejects_duplicate_creation() {
        let company_id = test_company_id();
        let party_id = test_party_id();
        let party = register(company_id, party_id, None);

        let cmd = RegisterParty {
            company_id,
            party_id,
            kind: PartyKind::Customer,
            name: "Again".to_string(),
            key: None,
            occurred_at: test_time(),
        };
        let err = party.handle(&PartyCommand::RegisterParty(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn rename_requires_same_company() {
        let party_id = test_party_id();
        let party = register(test_company_id(), party_id, None);

        let cmd = RenameParty {
            company_id: test_company_id(),
            party_id,
            name: "Other".to_string(),
            occurred_at: test_time(),
        };
        let err = party.handle(&PartyCommand::RenameParty(cmd)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn rename_on_missing_party_is_not_found() {
        let party_id = test_party_id();
        let party = Party::empty(party_id);
        let cmd = RenameParty {
            company_id: test_company_id(),
            party_id,
            name: "Nobody".to_string(),
            occurred_at: test_time(),
        };
        assert_eq!(
            party.handle(&PartyCommand::RenameParty(cmd)).unwrap_err(),
            DomainError::NotFound
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, ..ProptestConfig::default() })]

        #[test]
        fn rename_keeps_key_and_bumps_version(name in "[A-Za-z][A-Za-z ]{0,20}") {
            let company_id = test_company_id();
            let party_id = test_party_id();
            let mut party = register(company_id, party_id, Some("generic_vendor"));

            let cmd = RenameParty { company_id, party_id, name: name.clone(), occurred_at: test_time() };
            let events = party.handle(&PartyCommand::RenameParty(cmd)).unwrap();
            for e in &events {
                party.apply(e);
            }

            prop_assert_eq!(party.name(), name.trim());
            prop_assert_eq!(party.key(), Some("generic_vendor"));
            prop_assert_eq!(party.version(), 2);
        }
    }
}
