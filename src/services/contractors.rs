use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Contractor {
    pub id: &'static str,
    pub name: &'static str,
    pub trade: &'static str,
    pub phone: &'static str,
    pub email: &'static str,
    pub rating: f32,
}

const DIRECTORY: &[Contractor] = &[
    Contractor {
        id: "ctr-plumb-01",
        name: "Flowright Plumbing",
        trade: "plumbing",
        phone: "+44 20 7946 0101",
        email: "jobs@flowright.example",
        rating: 4.7,
    },
    Contractor {
        id: "ctr-plumb-02",
        name: "Pipe & Drain Co",
        trade: "plumbing",
        phone: "+44 20 7946 0102",
        email: "office@pipedrain.example",
        rating: 4.2,
    },
    Contractor {
        id: "ctr-elec-01",
        name: "Brightline Electrical",
        trade: "electrical",
        phone: "+44 20 7946 0201",
        email: "hello@brightline.example",
        rating: 4.8,
    },
    Contractor {
        id: "ctr-heat-01",
        name: "Warmhouse Heating",
        trade: "heating",
        phone: "+44 20 7946 0301",
        email: "service@warmhouse.example",
        rating: 4.5,
    },
    Contractor {
        id: "ctr-appl-01",
        name: "Fixit Appliances",
        trade: "appliances",
        phone: "+44 20 7946 0401",
        email: "repairs@fixit.example",
        rating: 4.1,
    },
    Contractor {
        id: "ctr-lock-01",
        name: "Keystone Locksmiths",
        trade: "locksmith",
        phone: "+44 20 7946 0501",
        email: "call@keystone.example",
        rating: 4.6,
    },
    Contractor {
        id: "ctr-gen-01",
        name: "Handy Lane Maintenance",
        trade: "general",
        phone: "+44 20 7946 0601",
        email: "bookings@handylane.example",
        rating: 4.3,
    },
];

pub fn list_contractors(trade: Option<&str>) -> Vec<Contractor> {
    let trade = trade.map(str::trim).filter(|value| !value.is_empty());
    DIRECTORY
        .iter()
        .filter(|contractor| trade.map_or(true, |trade| contractor.trade.eq_ignore_ascii_case(trade)))
        .copied()
        .collect()
}

pub fn find_contractor(contractor_id: &str) -> Option<Contractor> {
    let contractor_id = contractor_id.trim();
    DIRECTORY
        .iter()
        .find(|contractor| contractor.id.eq_ignore_ascii_case(contractor_id))
        .copied()
}

/// Highest rated contractor whose trade matches a maintenance category,
/// falling back to the general trade.
pub fn recommend_for_category(category: &str) -> Option<Contractor> {
    let best = |trade: &str| {
        list_contractors(Some(trade))
            .into_iter()
            .max_by(|left, right| left.rating.total_cmp(&right.rating))
    };
    best(category).or_else(|| best("general"))
}
