//! Testing utilities: a recording notifier, fixtures and an in-memory harness.
//!
//! # Example
//!
//! ```rust,ignore
//! use custodian_core::testing::{fixtures, TestLifecycle};
//!
//! let t = TestLifecycle::new();
//! let asset = t.register_asset("LT-0001");
//! let ticket = t.open_ticket(&asset.id);
//! t.open_repair(&ticket.id, &asset.id);
//!
//! assert_eq!(t.notifier.event_types().last(), Some(&"asset_status_changed"));
//! ```

mod harness;
mod recording_notifier;

pub use harness::TestLifecycle;
pub use recording_notifier::RecordingNotifier;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::access::{Action, Actor, Resource};
    use crate::asset::NewAsset;
    use crate::config::AccessGrant;
    use crate::directory::{DirectoryKind, StaticDirectory};
    use crate::ticket::NewTicket;

    pub const CATEGORY_ID: &str = "laptops";
    pub const DEPARTMENT_ID: &str = "it";
    pub const EMPLOYEE_ID: &str = "e-1";

    /// May do everything.
    pub fn admin() -> Actor {
        Actor::new("u-admin", "admin")
    }

    /// Works tickets and repairs.
    pub fn technician() -> Actor {
        Actor::new("u-tech", "technician")
    }

    /// Runs the issuance desk.
    pub fn clerk() -> Actor {
        Actor::new("u-clerk", "clerk")
    }

    /// Staff member who reports problems.
    pub fn reporter() -> Actor {
        Actor::new("u-staff", "staff")
    }

    /// Known user whose role holds no grants.
    pub fn employee() -> Actor {
        Actor::new("u-guest", "guest")
    }

    /// A laptop in the fixture category and department.
    pub fn laptop(barcode: &str) -> NewAsset {
        NewAsset::new(format!("Laptop {barcode}"), barcode, CATEGORY_ID, DEPARTMENT_ID)
            .with_model("ThinkPad T14")
            .with_serial_number(format!("SN-{barcode}"))
    }

    pub fn hinge_ticket() -> NewTicket {
        NewTicket::new("Broken hinge", "Screen wobbles when the lid is opened")
    }

    /// Grants matching the fixture actors' roles.
    pub fn grants() -> Vec<AccessGrant> {
        let all_actions = vec![Action::Create, Action::Update, Action::Delete];
        vec![
            AccessGrant {
                role: "admin".to_string(),
                resources: vec![
                    Resource::Asset,
                    Resource::Ticket,
                    Resource::Repair,
                    Resource::Issuance,
                ],
                actions: all_actions,
            },
            AccessGrant {
                role: "technician".to_string(),
                resources: vec![Resource::Asset, Resource::Ticket, Resource::Repair],
                actions: vec![Action::Create, Action::Update],
            },
            AccessGrant {
                role: "clerk".to_string(),
                resources: vec![Resource::Issuance],
                actions: vec![Action::Create, Action::Update],
            },
            AccessGrant {
                role: "clerk".to_string(),
                resources: vec![Resource::Ticket],
                actions: vec![Action::Create],
            },
            AccessGrant {
                role: "staff".to_string(),
                resources: vec![Resource::Ticket],
                actions: vec![Action::Create],
            },
        ]
    }

    /// Directory holding every fixture id.
    pub fn directory() -> StaticDirectory {
        let mut directory = StaticDirectory::new()
            .with(DirectoryKind::Category, CATEGORY_ID, "Laptops")
            .with(DirectoryKind::Department, DEPARTMENT_ID, "IT")
            .with(DirectoryKind::Employee, EMPLOYEE_ID, "Robin Vega")
            .with(DirectoryKind::Employee, "e-2", "Alex Moreau");
        for actor in [admin(), technician(), clerk(), reporter(), employee()] {
            directory = directory.with(DirectoryKind::User, &actor.id, &actor.id);
        }
        directory
    }
}
