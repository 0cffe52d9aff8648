//! Table bootstrap and lookup seeding.
//!
//! Every statement is idempotent, so bootstrapping an existing database is a
//! no-op apart from adding missing seed rows.

use crate::rows::DbResultExt;
use rolodex_core::{LabelCategory, RolodexResult};
use rusqlite::{params, Connection};

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS accounts (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  sync_counter INTEGER NOT NULL DEFAULT 0 CHECK (sync_counter >= 0),
  created_at_ms INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS contact_label_types (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  category TEXT NOT NULL,
  name TEXT NOT NULL,
  UNIQUE (category, name)
);

CREATE TABLE IF NOT EXISTS relationship_types (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL UNIQUE COLLATE NOCASE,
  reverse_male TEXT,
  reverse_female TEXT,
  reverse_neutral TEXT
);

CREATE TABLE IF NOT EXISTS contacts (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
  uid TEXT NOT NULL,
  prefix TEXT,
  given_name TEXT,
  middle_name TEXT,
  family_name TEXT,
  suffix TEXT,
  nickname TEXT,
  full_name TEXT NOT NULL,
  gender TEXT NOT NULL DEFAULT 'unspecified',
  birthday TEXT,
  notes TEXT,
  version_token INTEGER NOT NULL DEFAULT 0,
  last_modified_token INTEGER NOT NULL DEFAULT 0,
  etag TEXT NOT NULL DEFAULT '',
  stamp_pending INTEGER NOT NULL DEFAULT 1,
  created_at_ms INTEGER NOT NULL,
  updated_at_ms INTEGER NOT NULL,
  deleted_at_ms INTEGER,
  UNIQUE (account_id, uid)
);

CREATE INDEX IF NOT EXISTS idx_contacts_account_version
  ON contacts(account_id, version_token);
CREATE INDEX IF NOT EXISTS idx_contacts_deleted
  ON contacts(deleted_at_ms) WHERE deleted_at_ms IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_contacts_pending
  ON contacts(stamp_pending) WHERE stamp_pending = 1;

CREATE TABLE IF NOT EXISTS contact_emails (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  label_type_id INTEGER REFERENCES contact_label_types(id),
  address TEXT NOT NULL,
  is_primary INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS contact_phones (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  label_type_id INTEGER REFERENCES contact_label_types(id),
  number TEXT NOT NULL,
  is_primary INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS contact_addresses (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  label_type_id INTEGER REFERENCES contact_label_types(id),
  street TEXT,
  extended TEXT,
  city TEXT,
  region TEXT,
  postal_code TEXT,
  country TEXT
);

CREATE TABLE IF NOT EXISTS contact_organizations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  name TEXT NOT NULL,
  title TEXT,
  department TEXT
);

CREATE TABLE IF NOT EXISTS contact_urls (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  label_type_id INTEGER REFERENCES contact_label_types(id),
  url TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contact_other_dates (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  label TEXT NOT NULL,
  date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contact_relationships (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  related_contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  relationship_type_id INTEGER NOT NULL REFERENCES relationship_types(id),
  UNIQUE (contact_id, related_contact_id, relationship_type_id)
);

CREATE INDEX IF NOT EXISTS idx_relationships_related
  ON contact_relationships(related_contact_id);

CREATE TABLE IF NOT EXISTS contact_other_relationships (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
  name TEXT NOT NULL,
  relationship_type_id INTEGER REFERENCES relationship_types(id)
);
"#;

/// Child tables cleared by replace-all updates and tombstoning.
pub(crate) const CHILD_TABLES: [&str; 8] = [
    "contact_emails",
    "contact_phones",
    "contact_addresses",
    "contact_organizations",
    "contact_urls",
    "contact_other_dates",
    "contact_relationships",
    "contact_other_relationships",
];

/// Default labels per category.
const LABEL_SEED: &[(LabelCategory, &[&str])] = &[
    (LabelCategory::Phone, &["Mobile", "Home", "Work", "Fax", "Other"]),
    (LabelCategory::Email, &["Home", "Work", "Other"]),
    (LabelCategory::Address, &["Home", "Work", "Other"]),
    (LabelCategory::Url, &["Homepage", "Work", "Blog", "Other"]),
];

/// Default relationship catalog: (name, reverse male, reverse female, reverse neutral).
///
/// An edge `(A, B, name)` reads "B is A's name"; the reverse name is picked by
/// A's gender.
const RELATIONSHIP_SEED: &[(&str, Option<&str>, Option<&str>, Option<&str>)] = &[
    ("Father", Some("Son"), Some("Daughter"), Some("Child")),
    ("Mother", Some("Son"), Some("Daughter"), Some("Child")),
    ("Parent", Some("Son"), Some("Daughter"), Some("Child")),
    ("Son", Some("Father"), Some("Mother"), Some("Parent")),
    ("Daughter", Some("Father"), Some("Mother"), Some("Parent")),
    ("Child", Some("Father"), Some("Mother"), Some("Parent")),
    ("Brother", Some("Brother"), Some("Sister"), Some("Sibling")),
    ("Sister", Some("Brother"), Some("Sister"), Some("Sibling")),
    ("Sibling", Some("Brother"), Some("Sister"), Some("Sibling")),
    ("Husband", Some("Husband"), Some("Wife"), Some("Spouse")),
    ("Wife", Some("Husband"), Some("Wife"), Some("Spouse")),
    ("Spouse", Some("Husband"), Some("Wife"), Some("Spouse")),
    ("Partner", None, None, Some("Partner")),
    ("Grandfather", Some("Grandson"), Some("Granddaughter"), Some("Grandchild")),
    ("Grandmother", Some("Grandson"), Some("Granddaughter"), Some("Grandchild")),
    ("Grandparent", Some("Grandson"), Some("Granddaughter"), Some("Grandchild")),
    ("Grandson", Some("Grandfather"), Some("Grandmother"), Some("Grandparent")),
    ("Granddaughter", Some("Grandfather"), Some("Grandmother"), Some("Grandparent")),
    ("Grandchild", Some("Grandfather"), Some("Grandmother"), Some("Grandparent")),
    ("Uncle", Some("Nephew"), Some("Niece"), None),
    ("Aunt", Some("Nephew"), Some("Niece"), None),
    ("Nephew", Some("Uncle"), Some("Aunt"), None),
    ("Niece", Some("Uncle"), Some("Aunt"), None),
    ("Friend", None, None, Some("Friend")),
    ("Colleague", None, None, Some("Colleague")),
    ("Manager", None, None, Some("Direct Report")),
    ("Direct Report", None, None, Some("Manager")),
    ("Acquaintance", None, None, None),
];

/// Create missing tables and seed the lookup catalogs.
pub(crate) fn bootstrap(conn: &Connection) -> RolodexResult<()> {
    conn.execute_batch(SCHEMA).db()?;

    {
        let mut stmt = conn
            .prepare("INSERT OR IGNORE INTO contact_label_types (category, name) VALUES (?1, ?2)")
            .db()?;
        for (category, names) in LABEL_SEED {
            for name in *names {
                stmt.execute(params![category.as_db_str(), name]).db()?;
            }
        }
    }

    let mut stmt = conn
        .prepare(
            "INSERT OR IGNORE INTO relationship_types \
             (name, reverse_male, reverse_female, reverse_neutral) VALUES (?1, ?2, ?3, ?4)",
        )
        .db()?;
    for (name, male, female, neutral) in RELATIONSHIP_SEED {
        stmt.execute(params![name, male, female, neutral]).db()?;
    }

    Ok(())
}
