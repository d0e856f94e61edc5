// Blacklist filtering and digital-share metrics over matched skills.

pub mod blacklist;
pub mod digital_share;
pub mod handlers;
