pub mod ledger;
pub mod mailer;
