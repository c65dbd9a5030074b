use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

impl Health {
    pub fn ok(service: &'static str) -> Self {
        Self { status: "ok", service, version: env!("CARGO_PKG_VERSION") }
    }
}
