//! Data models for Rentwise

pub mod damage_report;
pub mod enums;
pub mod item;
pub mod payment;
pub mod rental;
pub mod session;
pub mod user;

// Re-export commonly used types
pub use damage_report::{DamageReport, ImageUpload, NewDamageReport};
pub use enums::{DamageReportStatus, PaymentStatus, RentalStatus};
pub use item::Item;
pub use payment::{Payment, PayoutCommand, PayoutInstruction, PayoutReceipt, PayoutRequest};
pub use rental::{CreateRental, NewRental, Rental};
pub use session::Session;
pub use user::User;
