use chrono::{DateTime, Duration, Utc};

use crate::domain::transfer::{HistoryEntry, Transfer, TransferStatus};

struct DemoJob {
    id: &'static str,
    name: &'static str,
    lead: &'static str,
    location: &'static str,
    pickup: DateTime<Utc>,
    ride: Duration,
    deal: &'static str,
}

impl DemoJob {
    fn pending(self, created_at: DateTime<Utc>) -> Transfer {
        Transfer {
            id: self.id.to_string(),
            name: self.name.to_string(),
            external_lead_id: self.lead.to_string(),
            location: self.location.to_string(),
            pickup_time: self.pickup,
            drop_off_time: self.pickup + self.ride,
            status: TransferStatus::Pending,
            created_at,
            updated_at: created_at,
            history: Vec::new(),
            deal_id: Some(self.deal.to_string()),
            version: 1,
        }
    }
}

fn entry(
    status: TransferStatus,
    note: &str,
    timestamp: DateTime<Utc>,
    can_undo: bool,
) -> HistoryEntry {
    HistoryEntry {
        status,
        note: note.to_string(),
        timestamp,
        can_undo,
        is_undo: false,
    }
}

/// Demo jobs for local runs, spread from last week to next week.
///
/// `demo456` has a driver that just arrived and can still undo that step;
/// `demo303` is a finished job with its full history.
pub fn demo_transfers(now: DateTime<Utc>) -> Vec<Transfer> {
    let ride = Duration::minutes(45);

    let waiting = DemoJob {
        id: "demo123",
        name: "Ahmet Yilmaz",
        lead: "LEAD-001",
        location: "Ataturk Caddesi No:123, Merkez Is Merkezi, Kat 4 Daire 15",
        pickup: now + Duration::minutes(90),
        ride,
        deal: "deal_001",
    }
    .pending(now);

    let mut arrived = DemoJob {
        id: "demo456",
        name: "Fatma Demir",
        lead: "LEAD-002",
        location: "Istiklal Caddesi No:456, Galata Kulesi yani",
        pickup: now + Duration::minutes(10),
        ride,
        deal: "deal_002",
    }
    .pending(now - Duration::hours(1));
    arrived.status = TransferStatus::Arrived;
    arrived.history = vec![entry(
        TransferStatus::Arrived,
        "At the pickup point, contacted the passenger",
        now,
        true,
    )];
    arrived.updated_at = now;
    arrived.version = 2;

    let tomorrow = DemoJob {
        id: "demo789",
        name: "Mehmet Kaya",
        lead: "LEAD-003",
        location: "Bagdat Caddesi No:789, Kadikoy",
        pickup: now + Duration::days(1),
        ride: Duration::hours(1),
        deal: "deal_003",
    }
    .pending(now);

    let next_week = DemoJob {
        id: "demo202",
        name: "Can Yildiz",
        lead: "LEAD-005",
        location: "Levent, Buyukdere Caddesi No:202",
        pickup: now + Duration::days(7),
        ride: Duration::hours(1),
        deal: "deal_005",
    }
    .pending(now);

    let pickup = now - Duration::days(7);
    let mut finished = DemoJob {
        id: "demo303",
        name: "Zeynep Arslan",
        lead: "LEAD-006",
        location: "Beyoglu, Istiklal Caddesi No:303",
        pickup,
        ride: Duration::hours(1),
        deal: "deal_006",
    }
    .pending(now - Duration::days(8));
    finished.status = TransferStatus::DroppedOff;
    finished.history = vec![
        entry(
            TransferStatus::Arrived,
            "At the pickup point",
            pickup - Duration::minutes(15),
            false,
        ),
        entry(TransferStatus::PickedUp, "Passenger on board", pickup, false),
        entry(
            TransferStatus::DroppedOff,
            "Transfer completed",
            pickup + Duration::hours(1),
            false,
        ),
    ];
    finished.updated_at = pickup + Duration::hours(1);
    finished.version = 4;

    vec![waiting, arrived, tomorrow, next_week, finished]
}
