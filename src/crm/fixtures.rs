use crate::domain::deal::Deal;

#[allow(clippy::too_many_arguments)]
fn fixture(
    id: &str,
    lead_id: &str,
    deal_name: &str,
    contact_name: &str,
    account_name: &str,
    phone: &str,
    email: &str,
    address: &str,
    stage: &str,
    amount: f64,
) -> Deal {
    Deal {
        id: id.to_string(),
        lead_id: lead_id.to_string(),
        deal_name: deal_name.to_string(),
        contact_name: contact_name.to_string(),
        account_name: account_name.to_string(),
        phone: phone.to_string(),
        email: email.to_string(),
        address: address.to_string(),
        stage: stage.to_string(),
        amount,
    }
}

/// Sample deals served when the CRM cannot be reached.
pub fn fallback_deals() -> Vec<Deal> {
    vec![
        fixture(
            "deal_001",
            "LEAD-001",
            "Corporate Shuttle Service - Q1",
            "Ahmet Yilmaz",
            "ABC Teknoloji A.S.",
            "+90 212 555 0101",
            "ahmet.yilmaz@abctech.com",
            "Ataturk Caddesi No:123, Merkez Is Merkezi, Kat 4 Daire 15, Sisli/Istanbul",
            "Negotiation",
            15000.0,
        ),
        fixture(
            "deal_002",
            "LEAD-002",
            "VIP Transfer Package",
            "Fatma Demir",
            "XYZ Holding",
            "+90 212 555 0202",
            "fatma.demir@xyzholding.com",
            "Istiklal Caddesi No:456, Galata Kulesi yani, Beyoglu/Istanbul",
            "Closed Won",
            8500.0,
        ),
        fixture(
            "deal_003",
            "LEAD-003",
            "Airport Transfer Service",
            "Mehmet Kaya",
            "DEF Turizm Ltd.",
            "+90 216 555 0303",
            "mehmet.kaya@defturizm.com",
            "Bagdat Caddesi No:789, Kadikoy/Istanbul",
            "Proposal",
            12000.0,
        ),
        fixture(
            "deal_004",
            "LEAD-004",
            "Private Event Transport",
            "Ayse Ozkan",
            "GHI Events",
            "+90 212 555 0404",
            "ayse.ozkan@ghievents.com",
            "Nisantasi, Tesvikiye Caddesi No:101, Sisli/Istanbul",
            "Qualification",
            25000.0,
        ),
        fixture(
            "deal_005",
            "LEAD-005",
            "Monthly Transfer Subscription",
            "Can Yildiz",
            "JKL Consulting",
            "+90 212 555 0505",
            "can.yildiz@jklconsulting.com",
            "Levent, Buyukdere Caddesi No:202, Sisli/Istanbul",
            "Needs Analysis",
            18000.0,
        ),
        fixture(
            "deal_006",
            "LEAD-006",
            "Conference Transfer Service",
            "Zeynep Arslan",
            "MNO Organizasyon",
            "+90 212 555 0606",
            "zeynep.arslan@mnoorg.com",
            "Beyoglu, Istiklal Caddesi No:303, Istanbul",
            "Closed Won",
            9500.0,
        ),
    ]
}

/// Fixture deals whose lead id contains `lead_id` (already upper-cased).
pub fn matching_fallback_deals(lead_id: &str) -> Vec<Deal> {
    fallback_deals()
        .into_iter()
        .filter(|deal| deal.lead_id.contains(lead_id))
        .collect()
}
