//! Integration tests for the ledger service over the in-memory store.
//!
//! Tests: Principal → LedgerService → CommandDispatcher → EventStore → stock view
//!
//! Verifies:
//! - Workflow scenarios end with the expected stock on both sides
//! - Rejected operations commit nothing
//! - Racing decisions on one transfer leave exactly one winner

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Barrier};

    use chrono::NaiveDate;
    use serde_json::Value as JsonValue;

    use labstock_auth::{Principal, Role};
    use labstock_core::{AggregateId, ExpectedVersion, ItemCode, RoomCode, UserId};
    use labstock_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
    use labstock_inventory::{ConsumptionLine, Item, Room};
    use labstock_opname::VarianceKind;
    use labstock_procurement::{QuantityLine, RequestStatus, RequestedItem};
    use labstock_stock::{BaselinePolicy, StockFactKind};
    use labstock_transfers::{ApprovalLine, LineOutcome, RequestedLine, TransferStatus};

    use crate::catalog::{Catalog, InMemoryCatalog};
    use crate::config::LedgerConfig;
    use crate::event_store::{
        EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent,
    };
    use crate::ledger::{
        ConsumptionEntry, LedgerError, LedgerService, NewProcurementRequest, NewTransfer,
        OpnameSubmission, PhysicalCount,
    };

    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Service = LedgerService<Arc<InMemoryEventStore>, Bus>;

    fn room(code: &str) -> RoomCode {
        RoomCode::new(code).unwrap()
    }

    fn item(code: &str) -> ItemCode {
        ItemCode::new(code).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        let catalog = InMemoryCatalog::new();
        for code in ["LAB-A", "LAB-B"] {
            catalog.upsert_room(Room {
                code: room(code),
                department: "chemistry".to_string(),
                active: true,
            });
        }
        catalog.upsert_room(Room {
            code: room("OLD-LAB"),
            department: "chemistry".to_string(),
            active: false,
        });
        for (code, active) in [("BEAKER", true), ("FLASK", true), ("BURETTE", false)] {
            catalog.upsert_item(Item {
                code: item(code),
                name: code.to_lowercase(),
                unit: "pcs".to_string(),
                category: "glassware".to_string(),
                active,
            });
        }
        Arc::new(catalog)
    }

    fn setup_with(config: LedgerConfig) -> (Service, Arc<InMemoryEventStore>, Bus) {
        let store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let catalog: Arc<dyn Catalog> = catalog();
        let service = LedgerService::new(store.clone(), bus.clone(), catalog, config);
        (service, store, bus)
    }

    fn setup() -> (Service, Arc<InMemoryEventStore>, Bus) {
        setup_with(LedgerConfig::default())
    }

    fn operator(code: &str) -> Principal {
        Principal::new(UserId::new(), vec![Role::room_operator(room(code))])
    }

    fn logistics() -> Principal {
        Principal::new(UserId::new(), vec![Role::LogisticsOperator])
    }

    fn admin() -> Principal {
        Principal::new(UserId::new(), vec![Role::SystemAdmin])
    }

    fn count(service: &Service, at: &str, code: &str, physical_qty: i64) {
        service
            .submit_opname(
                &operator(at),
                &room(at),
                OpnameSubmission {
                    date: day(),
                    lines: vec![PhysicalCount {
                        item: item(code),
                        physical_qty,
                    }],
                },
            )
            .unwrap();
    }

    fn level(service: &Service, at: &str, code: &str) -> i64 {
        service
            .compute_stock(&admin(), &room(at), &item(code))
            .unwrap()
            .quantity
    }

    fn new_transfer(qty: i64) -> NewTransfer {
        NewTransfer {
            source_room: room("LAB-A"),
            dest_room: room("LAB-B"),
            date: day(),
            lines: vec![RequestedLine {
                item: item("BEAKER"),
                requested_qty: qty,
            }],
        }
    }

    fn approve_beakers(qty: i64) -> Vec<ApprovalLine> {
        vec![ApprovalLine {
            item: item("BEAKER"),
            approved_qty: qty,
        }]
    }

    fn drain(sub: &Subscription<EventEnvelope<JsonValue>>) -> Vec<EventEnvelope<JsonValue>> {
        let mut out = Vec::new();
        while let Ok(env) = sub.try_recv() {
            out.push(env);
        }
        out
    }

    // -------------------------
    // Workflow scenarios
    // -------------------------

    #[test]
    fn partial_approval_moves_only_the_approved_quantity() {
        let (service, _store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        assert_eq!(level(&service, "LAB-A", "BEAKER"), 10);

        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(10))
            .unwrap();
        assert_eq!(created.status, TransferStatus::Pending);
        assert_eq!(created.lines[0].outcome, LineOutcome::Awaiting);
        // pending transfers move nothing
        assert_eq!(level(&service, "LAB-A", "BEAKER"), 10);

        let decided = service
            .approve_transfer(&operator("LAB-B"), created.id, approve_beakers(4))
            .unwrap();
        assert_eq!(decided.status, TransferStatus::PartialApproved);
        assert_eq!(decided.lines[0].line.approved_qty, Some(4));
        assert_eq!(decided.lines[0].outcome, LineOutcome::Partial);

        assert_eq!(level(&service, "LAB-A", "BEAKER"), 6);
        assert_eq!(level(&service, "LAB-B", "BEAKER"), 4);

        let movements = service
            .list_stock_events(&operator("LAB-B"), &room("LAB-B"))
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].kind, StockFactKind::TransferIn);
        assert_eq!(movements[0].quantity, 4);
        assert_eq!(movements[0].counterpart, Some(room("LAB-A")));
    }

    #[test]
    fn procurement_closes_with_a_receipt_that_counts_as_stock_in() {
        let (service, _store, _bus) = setup();
        let requester = operator("LAB-A");

        let request = service
            .create_procurement_request(
                &requester,
                NewProcurementRequest {
                    room: room("LAB-A"),
                    date: day(),
                    lines: vec![RequestedItem {
                        item: item("FLASK"),
                        qty_requested: 5,
                    }],
                },
            )
            .unwrap();
        assert_eq!(request.status, RequestStatus::AwaitingDispatch);

        let dispatched = service
            .dispatch_procurement_request(
                &logistics(),
                request.id,
                vec![QuantityLine {
                    item: item("FLASK"),
                    qty: 5,
                }],
            )
            .unwrap();
        assert_eq!(dispatched.status, RequestStatus::Dispatched);
        assert_eq!(dispatched.lines[0].qty_dispatched, Some(5));
        // dispatch alone moves no stock
        assert_eq!(level(&service, "LAB-A", "FLASK"), 0);

        let closed = service
            .acknowledge_procurement_request(
                &requester,
                request.id,
                vec![QuantityLine {
                    item: item("FLASK"),
                    qty: 5,
                }],
            )
            .unwrap();
        assert_eq!(closed.status, RequestStatus::Closed);
        let receipt = closed.receipt.expect("closed request carries its receipt");
        assert_eq!(receipt.total_qty(), Some(5));

        let receipts = service.list_receipts(&requester, &room("LAB-A")).unwrap();
        assert_eq!(receipts, vec![receipt]);
        assert!(service.list_receipts(&requester, &room("LAB-B")).unwrap().is_empty());
        assert_eq!(level(&service, "LAB-A", "FLASK"), 5);
    }

    #[test]
    fn opname_freezes_system_quantity_and_variance() {
        let (service, _store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 5);

        let record = service
            .submit_opname(
                &operator("LAB-A"),
                &room("LAB-A"),
                OpnameSubmission {
                    date: day(),
                    lines: vec![PhysicalCount {
                        item: item("BEAKER"),
                        physical_qty: 3,
                    }],
                },
            )
            .unwrap();
        let line = &record.lines[0];
        assert_eq!(line.system_qty, 5);
        assert_eq!(line.physical_qty, 3);
        assert_eq!(line.variance, -2);
        assert_eq!(line.variance_kind, VarianceKind::Minus);
        assert_eq!(level(&service, "LAB-A", "BEAKER"), 3);

        // later movements never rewrite a submitted record
        service
            .record_consumption(
                &operator("LAB-A"),
                &room("LAB-A"),
                ConsumptionEntry {
                    date: day(),
                    lines: vec![ConsumptionLine {
                        item: item("BEAKER"),
                        quantity: 1,
                    }],
                },
            )
            .unwrap();
        let history = service
            .list_opname_records(&operator("LAB-A"), &room("LAB-A"))
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1], record);
        assert_eq!(level(&service, "LAB-A", "BEAKER"), 2);
    }

    #[test]
    fn rejection_moves_no_stock() {
        let (service, _store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(3))
            .unwrap();

        let rejected = service
            .reject_transfer(&operator("LAB-B"), created.id)
            .unwrap();
        assert_eq!(rejected.status, TransferStatus::Rejected);
        assert!(rejected.decided_by.is_some());
        assert_eq!(level(&service, "LAB-A", "BEAKER"), 10);
        assert_eq!(level(&service, "LAB-B", "BEAKER"), 0);
    }

    #[test]
    fn zero_approval_on_every_line_is_a_rejection() {
        let (service, _store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(3))
            .unwrap();

        let decided = service
            .approve_transfer(&operator("LAB-B"), created.id, approve_beakers(0))
            .unwrap();
        assert_eq!(decided.status, TransferStatus::Rejected);
        assert_eq!(level(&service, "LAB-A", "BEAKER"), 10);
    }

    // -------------------------
    // Lifecycle guards
    // -------------------------

    #[test]
    fn second_decision_is_a_state_conflict() {
        let (service, store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(5))
            .unwrap();
        service
            .approve_transfer(&operator("LAB-B"), created.id, approve_beakers(5))
            .unwrap();
        let committed = store.load_all().unwrap().len();

        let again = service.approve_transfer(&operator("LAB-B"), created.id, approve_beakers(5));
        assert!(matches!(again, Err(LedgerError::StateConflict(_))));
        let reject = service.reject_transfer(&operator("LAB-B"), created.id);
        assert!(matches!(reject, Err(LedgerError::StateConflict(_))));

        assert_eq!(store.load_all().unwrap().len(), committed);
        assert_eq!(level(&service, "LAB-B", "BEAKER"), 5);
    }

    #[test]
    fn decided_transfers_cannot_be_edited_or_deleted() {
        let (service, _store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(5))
            .unwrap();
        service
            .approve_transfer(&operator("LAB-B"), created.id, approve_beakers(2))
            .unwrap();

        let edit = service.edit_transfer(
            &operator("LAB-A"),
            created.id,
            vec![RequestedLine {
                item: item("BEAKER"),
                requested_qty: 1,
            }],
        );
        assert!(matches!(edit, Err(LedgerError::StateConflict(_))));
        let delete = service.delete_transfer(&operator("LAB-A"), created.id);
        assert!(matches!(delete, Err(LedgerError::StateConflict(_))));
        assert_eq!(level(&service, "LAB-A", "BEAKER"), 8);
    }

    #[test]
    fn pending_transfer_can_be_edited_then_deleted() {
        let (service, _store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(5))
            .unwrap();

        let edited = service
            .edit_transfer(
                &operator("LAB-A"),
                created.id,
                vec![RequestedLine {
                    item: item("BEAKER"),
                    requested_qty: 7,
                }],
            )
            .unwrap();
        assert_eq!(edited.lines[0].line.requested_qty, 7);
        assert_eq!(edited.version, created.version + 1);

        service.delete_transfer(&operator("LAB-A"), created.id).unwrap();
        assert_eq!(
            service.get_transfer(&admin(), created.id),
            Err(LedgerError::NotFound)
        );
        assert!(service.list_transfers(&admin(), None).unwrap().is_empty());
        let approve = service.approve_transfer(&operator("LAB-B"), created.id, approve_beakers(1));
        assert_eq!(approve, Err(LedgerError::NotFound));
    }

    #[test]
    fn over_approval_is_rejected_without_effect() {
        let (service, store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(5))
            .unwrap();
        let before = store.load_all().unwrap().len();

        let result = service.approve_transfer(&operator("LAB-B"), created.id, approve_beakers(6));
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(store.load_all().unwrap().len(), before);
        assert_eq!(
            service.get_transfer(&admin(), created.id).unwrap().status,
            TransferStatus::Pending
        );
    }

    #[test]
    fn procurement_lifecycle_is_enforced() {
        let (service, _store, _bus) = setup();
        let request = service
            .create_procurement_request(
                &operator("LAB-A"),
                NewProcurementRequest {
                    room: room("LAB-A"),
                    date: day(),
                    lines: vec![RequestedItem {
                        item: item("FLASK"),
                        qty_requested: 2,
                    }],
                },
            )
            .unwrap();

        let early = service.acknowledge_procurement_request(
            &operator("LAB-A"),
            request.id,
            vec![QuantityLine {
                item: item("FLASK"),
                qty: 2,
            }],
        );
        assert!(matches!(early, Err(LedgerError::StateConflict(_))));

        service
            .dispatch_procurement_request(&logistics(), request.id, vec![])
            .unwrap();
        let edit = service.edit_procurement_request(
            &operator("LAB-A"),
            request.id,
            vec![RequestedItem {
                item: item("FLASK"),
                qty_requested: 3,
            }],
        );
        assert!(matches!(edit, Err(LedgerError::StateConflict(_))));
        let delete = service.delete_procurement_request(&operator("LAB-A"), request.id);
        assert!(matches!(delete, Err(LedgerError::StateConflict(_))));
    }

    // -------------------------
    // Authorization and references
    // -------------------------

    #[test]
    fn only_the_destination_room_decides() {
        let (service, _store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(5))
            .unwrap();

        let by_source = service.approve_transfer(&operator("LAB-A"), created.id, approve_beakers(5));
        assert!(matches!(by_source, Err(LedgerError::Authorization(_))));
        let by_logistics = service.reject_transfer(&logistics(), created.id);
        assert!(matches!(by_logistics, Err(LedgerError::Authorization(_))));

        // admin acts on behalf of any room
        let decided = service
            .approve_transfer(&admin(), created.id, approve_beakers(5))
            .unwrap();
        assert_eq!(decided.status, TransferStatus::Approved);
    }

    #[test]
    fn room_operators_act_only_for_their_room() {
        let (service, store, _bus) = setup();
        let result = service.record_consumption(
            &operator("LAB-B"),
            &room("LAB-A"),
            ConsumptionEntry {
                date: day(),
                lines: vec![ConsumptionLine {
                    item: item("BEAKER"),
                    quantity: 1,
                }],
            },
        );
        assert!(matches!(result, Err(LedgerError::Authorization(_))));

        let foreign_source = service.create_transfer(&operator("LAB-B"), new_transfer(1));
        assert!(matches!(foreign_source, Err(LedgerError::Authorization(_))));

        let no_roles = Principal::new(UserId::new(), vec![]);
        let read = service.compute_stock(&no_roles, &room("LAB-A"), &item("BEAKER"));
        assert!(matches!(read, Err(LedgerError::Authorization(_))));

        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn only_logistics_dispatches() {
        let (service, _store, _bus) = setup();
        let request = service
            .create_procurement_request(
                &operator("LAB-A"),
                NewProcurementRequest {
                    room: room("LAB-A"),
                    date: day(),
                    lines: vec![RequestedItem {
                        item: item("FLASK"),
                        qty_requested: 1,
                    }],
                },
            )
            .unwrap();

        let result = service.dispatch_procurement_request(&operator("LAB-A"), request.id, vec![]);
        assert!(matches!(result, Err(LedgerError::Authorization(_))));
    }

    #[test]
    fn unknown_or_inactive_references_are_referential_errors() {
        let (service, store, _bus) = setup_with(LedgerConfig {
            enforce_available_stock: false,
            ..LedgerConfig::default()
        });

        let mut unknown_dest = new_transfer(1);
        unknown_dest.dest_room = room("LAB-Z");
        let result = service.create_transfer(&admin(), unknown_dest);
        assert!(matches!(result, Err(LedgerError::Referential(_))));

        let mut inactive_dest = new_transfer(1);
        inactive_dest.dest_room = room("OLD-LAB");
        let result = service.create_transfer(&admin(), inactive_dest);
        assert!(matches!(result, Err(LedgerError::Referential(_))));

        let result = service.submit_opname(
            &admin(),
            &room("LAB-A"),
            OpnameSubmission {
                date: day(),
                lines: vec![PhysicalCount {
                    item: item("BURETTE"),
                    physical_qty: 1,
                }],
            },
        );
        assert!(matches!(result, Err(LedgerError::Referential(_))));

        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn stock_reads_need_codes_the_catalog_knows() {
        let (service, _store, _bus) = setup();

        let result = service.compute_stock(&admin(), &room("LAB-Z"), &item("BEAKER"));
        assert!(matches!(result, Err(LedgerError::NotFound)));
        let result = service.compute_stock(&admin(), &room("LAB-A"), &item("PIPETTE"));
        assert!(matches!(result, Err(LedgerError::NotFound)));
        let result = service.list_stock_events(&admin(), &room("LAB-Z"));
        assert!(matches!(result, Err(LedgerError::NotFound)));
        let result = service.list_receipts(&admin(), &room("LAB-Z"));
        assert!(matches!(result, Err(LedgerError::NotFound)));

        // deactivated master data stays readable
        let retired = service
            .compute_stock(&admin(), &room("OLD-LAB"), &item("BURETTE"))
            .unwrap();
        assert_eq!(retired.quantity, 0);
        assert!(service.list_stock_events(&admin(), &room("OLD-LAB")).unwrap().is_empty());
    }

    #[test]
    fn oversized_quantities_are_refused_before_they_reach_the_ledger() {
        let (service, store, _bus) = setup();
        let requester = operator("LAB-A");
        let request = service
            .create_procurement_request(
                &requester,
                NewProcurementRequest {
                    room: room("LAB-A"),
                    date: day(),
                    lines: vec![RequestedItem {
                        item: item("FLASK"),
                        qty_requested: 5,
                    }],
                },
            )
            .unwrap();
        service
            .dispatch_procurement_request(&logistics(), request.id, vec![])
            .unwrap();
        let committed = store.load_all().unwrap().len();

        let result = service.acknowledge_procurement_request(
            &requester,
            request.id,
            vec![QuantityLine {
                item: item("FLASK"),
                qty: i64::MAX,
            }],
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        let result = service.submit_opname(
            &requester,
            &room("LAB-A"),
            OpnameSubmission {
                date: day(),
                lines: vec![PhysicalCount {
                    item: item("FLASK"),
                    physical_qty: i64::MAX,
                }],
            },
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        let result = service.record_consumption(
            &requester,
            &room("LAB-A"),
            ConsumptionEntry {
                date: day(),
                lines: vec![ConsumptionLine {
                    item: item("FLASK"),
                    quantity: i64::MAX,
                }],
            },
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        assert_eq!(store.load_all().unwrap().len(), committed);
        assert_eq!(level(&service, "LAB-A", "FLASK"), 0);

        let closed = service
            .acknowledge_procurement_request(
                &requester,
                request.id,
                vec![QuantityLine {
                    item: item("FLASK"),
                    qty: labstock_core::MAX_LINE_QUANTITY,
                }],
            )
            .unwrap();
        assert_eq!(closed.status, RequestStatus::Closed);
        assert_eq!(level(&service, "LAB-A", "FLASK"), labstock_core::MAX_LINE_QUANTITY);
    }

    // -------------------------
    // Stock policy and checks
    // -------------------------

    #[test]
    fn transfers_cannot_ask_for_more_than_is_available() {
        let (service, store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 3);
        let before = store.load_all().unwrap().len();

        let result = service.create_transfer(&operator("LAB-A"), new_transfer(4));
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(store.load_all().unwrap().len(), before);

        let (relaxed, _store, _bus) = setup_with(LedgerConfig {
            enforce_available_stock: false,
            ..LedgerConfig::default()
        });
        assert!(relaxed.create_transfer(&operator("LAB-A"), new_transfer(4)).is_ok());
    }

    #[test]
    fn baseline_policy_decides_whether_earlier_movements_count() {
        let history = |config: LedgerConfig| {
            let (service, _store, _bus) = setup_with(config);
            let request = service
                .create_procurement_request(
                    &operator("LAB-A"),
                    NewProcurementRequest {
                        room: room("LAB-A"),
                        date: day(),
                        lines: vec![RequestedItem {
                            item: item("FLASK"),
                            qty_requested: 5,
                        }],
                    },
                )
                .unwrap();
            service
                .dispatch_procurement_request(&logistics(), request.id, vec![])
                .unwrap();
            service
                .acknowledge_procurement_request(
                    &operator("LAB-A"),
                    request.id,
                    vec![QuantityLine {
                        item: item("FLASK"),
                        qty: 5,
                    }],
                )
                .unwrap();
            count(&service, "LAB-A", "FLASK", 3);
            service
                .compute_stock(&admin(), &room("LAB-A"), &item("FLASK"))
                .unwrap()
        };

        let all = history(LedgerConfig::default());
        assert_eq!(all.policy, BaselinePolicy::AllHistory);
        assert_eq!(all.breakdown.baseline, 3);
        assert_eq!(all.breakdown.receipts, 5);
        assert_eq!(all.quantity, 8);

        let since = history(LedgerConfig {
            baseline_policy: BaselinePolicy::SinceLatestOpname,
            ..LedgerConfig::default()
        });
        assert_eq!(since.breakdown.receipts, 0);
        assert_eq!(since.quantity, 3);
    }

    #[test]
    fn stock_is_recomputed_from_the_store_alone() {
        let (service, store, bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(6))
            .unwrap();
        service
            .approve_transfer(&operator("LAB-B"), created.id, approve_beakers(6))
            .unwrap();

        let catalog: Arc<dyn Catalog> = catalog();
        let rebuilt = LedgerService::new(store, bus, catalog, LedgerConfig::default());
        assert_eq!(level(&rebuilt, "LAB-A", "BEAKER"), 4);
        assert_eq!(level(&rebuilt, "LAB-B", "BEAKER"), 6);
    }

    // -------------------------
    // Listing
    // -------------------------

    #[test]
    fn transfers_list_in_creation_order_and_filter_by_room() {
        let (service, _store, _bus) = setup_with(LedgerConfig {
            enforce_available_stock: false,
            ..LedgerConfig::default()
        });
        let first = service.create_transfer(&admin(), new_transfer(1)).unwrap();
        let second = service
            .create_transfer(
                &admin(),
                NewTransfer {
                    source_room: room("LAB-B"),
                    dest_room: room("LAB-A"),
                    date: day(),
                    lines: vec![RequestedLine {
                        item: item("FLASK"),
                        requested_qty: 2,
                    }],
                },
            )
            .unwrap();

        let ids: Vec<AggregateId> = service
            .list_transfers(&admin(), None)
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let for_b = service.list_transfers(&admin(), Some(&room("LAB-B"))).unwrap();
        assert_eq!(for_b.len(), 2);
        let for_other = service.list_transfers(&admin(), Some(&room("OLD-LAB"))).unwrap();
        assert!(for_other.is_empty());

        let requests = service
            .list_procurement_requests(&admin(), Some(&room("LAB-A")))
            .unwrap();
        assert!(requests.is_empty());
    }

    // -------------------------
    // Concurrency and failure
    // -------------------------

    #[test]
    fn concurrent_approvals_leave_exactly_one_winner() {
        let (service, store, _bus) = setup();
        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(5))
            .unwrap();
        let approver = operator("LAB-B");
        let barrier = Barrier::new(2);

        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = [5, 3]
                .into_iter()
                .map(|qty| {
                    let (service, approver, barrier) = (&service, &approver, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        service.approve_transfer(approver, created.id, approve_beakers(qty))
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(LedgerError::StateConflict(_))))
        );

        let decisions = store
            .load_stream(created.id)
            .unwrap()
            .iter()
            .filter(|e| e.event_type == "transfers.transfer.approved")
            .count();
        assert_eq!(decisions, 1);
        let moved = level(&service, "LAB-B", "BEAKER");
        assert!(moved == 5 || moved == 3);
        assert_eq!(level(&service, "LAB-A", "BEAKER"), 10 - moved);
    }

    /// Store whose appends fail while `failing` is set; reads always go through.
    struct FailingAppendStore {
        inner: InMemoryEventStore,
        failing: AtomicBool,
    }

    impl FailingAppendStore {
        fn new(failing: bool) -> Self {
            Self {
                inner: InMemoryEventStore::new(),
                failing: AtomicBool::new(failing),
            }
        }

        fn fail_appends(&self) {
            self.failing.store(true, Ordering::SeqCst);
        }
    }

    impl EventStore for FailingAppendStore {
        fn append(
            &self,
            events: Vec<UncommittedEvent>,
            expected_version: ExpectedVersion,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(EventStoreError::Unavailable("disk full".to_string()));
            }
            self.inner.append(events, expected_version)
        }

        fn load_stream(
            &self,
            aggregate_id: AggregateId,
        ) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_stream(aggregate_id)
        }

        fn load_all(&self) -> Result<Vec<StoredEvent>, EventStoreError> {
            self.inner.load_all()
        }
    }

    #[test]
    fn failed_append_surfaces_as_storage_and_publishes_nothing() {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let sub = bus.subscribe();
        let catalog: Arc<dyn Catalog> = catalog();
        let service = LedgerService::new(
            FailingAppendStore::new(true),
            bus.clone(),
            catalog,
            LedgerConfig::default(),
        );

        let result = service.record_consumption(
            &operator("LAB-A"),
            &room("LAB-A"),
            ConsumptionEntry {
                date: day(),
                lines: vec![ConsumptionLine {
                    item: item("BEAKER"),
                    quantity: 1,
                }],
            },
        );
        assert!(matches!(result, Err(LedgerError::Storage(_))));
        assert!(drain(&sub).is_empty());
        assert!(service.dispatcher().store().load_all().unwrap().is_empty());
    }

    #[test]
    fn failed_approval_moves_no_stock_and_leaves_the_transfer_pending() {
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let catalog: Arc<dyn Catalog> = catalog();
        let service = LedgerService::new(
            FailingAppendStore::new(false),
            bus.clone(),
            catalog,
            LedgerConfig::default(),
        );
        let stock = |at: &str| {
            service
                .compute_stock(&admin(), &room(at), &item("BEAKER"))
                .unwrap()
                .quantity
        };

        service
            .submit_opname(
                &operator("LAB-A"),
                &room("LAB-A"),
                OpnameSubmission {
                    date: day(),
                    lines: vec![PhysicalCount {
                        item: item("BEAKER"),
                        physical_qty: 10,
                    }],
                },
            )
            .unwrap();
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(6))
            .unwrap();
        let committed = service.dispatcher().store().load_all().unwrap().len();
        let sub = bus.subscribe();

        service.dispatcher().store().fail_appends();
        let result = service.approve_transfer(&operator("LAB-B"), created.id, approve_beakers(6));
        assert!(matches!(result, Err(LedgerError::Storage(_))));

        assert_eq!(stock("LAB-A"), 10);
        assert_eq!(stock("LAB-B"), 0);
        let transfer = service.get_transfer(&admin(), created.id).unwrap();
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert_eq!(transfer.lines[0].line.approved_qty, None);
        assert_eq!(service.dispatcher().store().load_all().unwrap().len(), committed);
        assert!(drain(&sub).is_empty());
    }

    /// Bus that refuses every message.
    struct ClosedBus;

    impl EventBus<EventEnvelope<JsonValue>> for ClosedBus {
        type Error = &'static str;

        fn publish(&self, _message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
            Err("closed")
        }

        fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
            let (_tx, rx) = std::sync::mpsc::channel();
            Subscription::new(rx)
        }
    }

    #[test]
    fn publish_failure_keeps_the_commit() {
        let catalog: Arc<dyn Catalog> = catalog();
        let service = LedgerService::new(
            InMemoryEventStore::new(),
            ClosedBus,
            catalog,
            LedgerConfig::default(),
        );

        service
            .submit_opname(
                &operator("LAB-A"),
                &room("LAB-A"),
                OpnameSubmission {
                    date: day(),
                    lines: vec![PhysicalCount {
                        item: item("BEAKER"),
                        physical_qty: 4,
                    }],
                },
            )
            .unwrap();
        let stock = service
            .compute_stock(&admin(), &room("LAB-A"), &item("BEAKER"))
            .unwrap();
        assert_eq!(stock.quantity, 4);
    }

    #[test]
    fn committed_events_reach_subscribers_in_order() {
        let (service, _store, bus) = setup();
        let sub = bus.subscribe();

        count(&service, "LAB-A", "BEAKER", 10);
        let created = service
            .create_transfer(&operator("LAB-A"), new_transfer(2))
            .unwrap();
        service
            .approve_transfer(&operator("LAB-B"), created.id, approve_beakers(2))
            .unwrap();

        let published = drain(&sub);
        let types: Vec<&str> = published.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "opname.record.submitted",
                "transfers.transfer.created",
                "transfers.transfer.approved"
            ]
        );
        let positions: Vec<u64> = published.iter().map(|e| e.global_position()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
