use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Service {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub duration: &'static str,
    pub price: f64,
}

pub const CATALOG: &[Service] = &[
    Service {
        id: "virtual-therapy",
        name: "Virtual Therapy",
        description: "Therapy at your fingertips, from anywhere.",
        duration: "45 min",
        price: 90.0,
    },
    Service {
        id: "individual-therapy",
        name: "Individual Therapy",
        description: "Guiding you to a healthier tomorrow.",
        duration: "1 hr",
        price: 100.0,
    },
    Service {
        id: "group-therapy",
        name: "Group Therapy",
        description: "Together we heal and grow.",
        duration: "1 hr",
        price: 75.0,
    },
    Service {
        id: "family-therapy",
        name: "Family Therapy",
        description: "Healing together as a family unit.",
        duration: "1 hr",
        price: 80.0,
    },
];

pub fn find_service(id: &str) -> Option<&'static Service> {
    CATALOG.iter().find(|s| s.id == id)
}
