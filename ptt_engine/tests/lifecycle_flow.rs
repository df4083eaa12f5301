use chrono::{Days, Utc};
use ptt_engine::{
    db_types::{
        BackingType,
        DocumentStatus,
        DocumentType,
        LedgerKind,
        LockConditions,
        Money,
        NewDocument,
        OfferStatus,
        PttStatus,
    },
    lifecycle::LifecycleError,
    AccountManagement,
    PttFlowError,
};

use crate::support::{TradeWorld, CREDIT_LIMIT, FACE_VALUE, TREASURY};

mod support;

#[tokio::test]
async fn full_lifecycle_with_discount() {
    let world = TradeWorld::new().await;
    let ptt = world.requested().await;
    assert_eq!(ptt.status, PttStatus::Requested);
    assert_eq!(ptt.current_owner, world.importer.id);

    let ptt = world.flow.issue_ptt(&world.banker, ptt.id).await.unwrap();
    assert_eq!(ptt.status, PttStatus::Issued);
    assert_eq!(world.org(world.importer.id).await.credit_used, Money::from(FACE_VALUE));

    let conditions = LockConditions::new(vec![DocumentType::BillOfLading]).with_notes("FOB Rotterdam");
    let ptt = world.flow.lock_ptt(&world.importer_user, ptt.id, conditions).await.unwrap();
    assert_eq!(ptt.status, PttStatus::Locked);
    assert_eq!(ptt.required_documents(), &[DocumentType::BillOfLading]);

    let ptt = world.flow.transfer_ptt(&world.importer_user, ptt.id, world.exporter.id).await.unwrap();
    assert_eq!(ptt.status, PttStatus::Transferred);
    assert_eq!(ptt.current_owner, world.exporter.id);
    assert_eq!(ptt.exporter, Some(world.exporter.id));

    let doc = NewDocument::new(DocumentType::BillOfLading, "bol-7731.pdf", "docs/bol-7731");
    let doc = world.flow.upload_document(&world.exporter_user, ptt.id, doc).await.unwrap();
    assert_eq!(doc.status, DocumentStatus::Pending);
    let review = world.flow.approve_document(&world.importer_user, doc.id).await.unwrap();
    assert!(review.promoted);
    assert_eq!(review.ptt.status, PttStatus::Redeemable);

    let offer_amount = Money::from(FACE_VALUE - 500_000);
    let offer = world.flow.make_offer(&world.funder_user, ptt.id, offer_amount).await.unwrap();
    let accepted = world.flow.accept_offer(&world.exporter_user, offer.id).await.unwrap();
    assert_eq!(accepted.ptt.status, PttStatus::Discounted);
    assert_eq!(accepted.ptt.current_owner, world.funder.id);
    assert_eq!(accepted.offer.status, OfferStatus::Accepted);

    let settled = world.flow.settle_payment(&world.banker, ptt.id).await.unwrap();
    assert_eq!(settled.ptt.status, PttStatus::Settled);
    assert_eq!(settled.ledger.len(), 1);
    assert_eq!(settled.ledger[0].kind, LedgerKind::Settlement);
    assert_eq!(settled.ledger[0].to_org, Some(world.funder.id));

    assert_eq!(world.org(world.bank.id).await.treasury_balance, Money::from(TREASURY - FACE_VALUE));
    assert_eq!(world.org(world.funder.id).await.treasury_balance, Money::from(TREASURY + 500_000));
    assert_eq!(world.org(world.exporter.id).await.treasury_balance, offer_amount);
    assert_eq!(world.org(world.importer.id).await.credit_used, Money::from(0));

    let history = world.db.fetch_status_history(ptt.id).await.unwrap();
    let steps = history.iter().map(|h| (h.old_status, h.new_status)).collect::<Vec<_>>();
    assert_eq!(steps, vec![
        (PttStatus::Requested, PttStatus::Issued),
        (PttStatus::Issued, PttStatus::Locked),
        (PttStatus::Locked, PttStatus::Transferred),
        (PttStatus::Transferred, PttStatus::Redeemable),
        (PttStatus::Redeemable, PttStatus::Discounted),
        (PttStatus::Discounted, PttStatus::Settled),
    ]);
    let kinds = world.db.fetch_ledger_for_ptt(ptt.id).await.unwrap().into_iter().map(|e| e.kind).collect::<Vec<_>>();
    assert_eq!(kinds, vec![LedgerKind::Issue, LedgerKind::Transfer, LedgerKind::Discount, LedgerKind::Settlement]);
    world.close().await;
}

#[tokio::test]
async fn settlement_without_discount_pays_the_exporter() {
    let world = TradeWorld::new().await;
    let ptt = world.redeemable().await;
    assert_eq!(ptt.status, PttStatus::Redeemable);
    let settled = world.flow.settle_payment(&world.banker, ptt.id).await.unwrap();
    assert_eq!(settled.ptt.status, PttStatus::Settled);
    assert_eq!(world.org(world.exporter.id).await.treasury_balance, Money::from(FACE_VALUE));
    assert_eq!(world.org(world.bank.id).await.treasury_balance, Money::from(TREASURY - FACE_VALUE));
    world.close().await;
}

#[tokio::test]
async fn stages_cannot_be_skipped_or_repeated() {
    let world = TradeWorld::new().await;
    let ptt = world.requested().await;
    let err = world.flow.lock_ptt(&world.importer_user, ptt.id, LockConditions::default()).await.unwrap_err();
    assert!(matches!(
        err,
        PttFlowError::Lifecycle(LifecycleError::IllegalTransition { from: PttStatus::Requested, to: PttStatus::Locked })
    ));
    let err = world.flow.transfer_ptt(&world.importer_user, ptt.id, world.exporter.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Lifecycle(LifecycleError::IllegalTransition { .. })));
    let err = world.flow.settle_payment(&world.banker, ptt.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Lifecycle(LifecycleError::IllegalTransition { .. })));
    assert_eq!(world.ptt(ptt.id).await.status, PttStatus::Requested);

    world.flow.issue_ptt(&world.banker, ptt.id).await.unwrap();
    let err = world.flow.issue_ptt(&world.banker, ptt.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Lifecycle(LifecycleError::IllegalTransition { .. })));
    // Issuing twice must not commit credit twice
    assert_eq!(world.org(world.importer.id).await.credit_used, Money::from(FACE_VALUE));
    world.close().await;
}

#[tokio::test]
async fn issuance_respects_the_credit_limit() {
    let world = TradeWorld::new().await;
    let big = CREDIT_LIMIT * 3 / 5;
    let first = world.flow.request_ptt(&world.importer_user, world.request(big, BackingType::Credit)).await.unwrap();
    let second = world.flow.request_ptt(&world.importer_user, world.request(big, BackingType::Credit)).await.unwrap();
    world.flow.issue_ptt(&world.banker, first.id).await.unwrap();
    let err = world.flow.issue_ptt(&world.banker, second.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Lifecycle(LifecycleError::CreditLimitExceeded { .. })));
    assert_eq!(world.ptt(second.id).await.status, PttStatus::Requested);
    assert_eq!(world.org(world.importer.id).await.credit_used, Money::from(big));

    // Raising the limit lets the second one through
    world.flow.set_credit_limit(&world.admin, world.importer.id, Money::from(big * 2)).await.unwrap();
    world.flow.issue_ptt(&world.banker, second.id).await.unwrap();
    assert_eq!(world.org(world.importer.id).await.available_credit(), Money::from(0));

    // and the limit can no longer drop below what is in use
    let err = world.flow.set_credit_limit(&world.admin, world.importer.id, Money::from(big)).await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));
    world.close().await;
}

#[tokio::test]
async fn treasury_backing_needs_bank_funds() {
    let world = TradeWorld::new().await;
    let keep = FACE_VALUE / 2;
    world.flow.withdraw(&world.admin, world.bank.id, Money::from(TREASURY - keep), "year-end sweep").await.unwrap();
    let backed =
        world.flow.request_ptt(&world.importer_user, world.request(FACE_VALUE, BackingType::Treasury)).await.unwrap();
    let err = world.flow.issue_ptt(&world.banker, backed.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Lifecycle(LifecycleError::InsufficientTreasury { .. })));
    assert_eq!(world.org(world.importer.id).await.credit_used, Money::from(0));

    let on_credit = world.requested().await;
    let issued = world.flow.issue_ptt(&world.banker, on_credit.id).await.unwrap();
    assert_eq!(issued.status, PttStatus::Issued);
    // Issuance reserves nothing in the treasury
    assert_eq!(world.org(world.bank.id).await.treasury_balance, Money::from(keep));
    world.close().await;
}

#[tokio::test]
async fn only_the_right_party_may_act() {
    let world = TradeWorld::new().await;
    let ptt = world.requested().await;
    let err = world.flow.issue_ptt(&world.exporter_user, ptt.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Forbidden(_)));
    let err = world.flow.issue_ptt(&world.importer_user, ptt.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Forbidden(_)));
    let ptt = world.flow.issue_ptt(&world.banker, ptt.id).await.unwrap();
    let err = world.flow.lock_ptt(&world.banker, ptt.id, LockConditions::default()).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Forbidden(_)));
    let err = world.flow.cancel_ptt(&world.funder_user, ptt.id, "not mine").await.unwrap_err();
    assert!(matches!(err, PttFlowError::Forbidden(_)));
    let err = world.flow.deposit(&world.banker, world.bank.id, Money::from(1), "gift").await.unwrap_err();
    assert!(matches!(err, PttFlowError::Forbidden(_)));
    // Admins may act for anyone
    let locked = world.flow.lock_ptt(&world.admin, ptt.id, LockConditions::default()).await.unwrap();
    assert_eq!(locked.status, PttStatus::Locked);
    world.close().await;
}

#[tokio::test]
async fn request_validation() {
    let world = TradeWorld::new().await;
    let mut past = world.request(FACE_VALUE, BackingType::Credit);
    past.maturity_date = Utc::now().date_naive().checked_sub_days(Days::new(1)).unwrap();
    let err = world.flow.request_ptt(&world.importer_user, past).await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));

    let err = world.flow.request_ptt(&world.importer_user, world.request(0, BackingType::Credit)).await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));

    let mut wrong_bank = world.request(FACE_VALUE, BackingType::Credit);
    wrong_bank.issuer_bank = world.funder.id;
    let err = world.flow.request_ptt(&world.importer_user, wrong_bank).await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));

    let err =
        world.flow.request_ptt(&world.exporter_user, world.request(FACE_VALUE, BackingType::Credit)).await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));
    world.close().await;
}

#[tokio::test]
async fn partial_or_rejected_documents_do_not_promote() {
    let world = TradeWorld::new().await;
    let ptt = world.transferred().await;
    let bol = NewDocument::new(DocumentType::BillOfLading, "bol.pdf", "docs/bol");
    let bol = world.flow.upload_document(&world.exporter_user, ptt.id, bol).await.unwrap();
    let invoice = NewDocument::new(DocumentType::CommercialInvoice, "inv.pdf", "docs/inv");
    let invoice = world.flow.upload_document(&world.exporter_user, ptt.id, invoice).await.unwrap();

    let err = world.flow.approve_document(&world.exporter_user, bol.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Forbidden(_)));

    let review = world.flow.approve_document(&world.importer_user, bol.id).await.unwrap();
    assert!(!review.promoted);
    assert_eq!(review.ptt.status, PttStatus::Transferred);

    let err = world.flow.reject_document(&world.importer_user, invoice.id, "  ").await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));
    let review = world.flow.reject_document(&world.importer_user, invoice.id, "Wrong consignee").await.unwrap();
    assert!(!review.promoted);
    assert_eq!(review.document.status, DocumentStatus::Rejected);
    assert_eq!(review.document.rejection_reason.as_deref(), Some("Wrong consignee"));

    let err = world.flow.approve_document(&world.importer_user, invoice.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::DocumentAlreadyReviewed(_)));

    let fixed = NewDocument::new(DocumentType::CommercialInvoice, "inv-v2.pdf", "docs/inv-v2");
    let fixed = world.flow.upload_document(&world.exporter_user, ptt.id, fixed).await.unwrap();
    let review = world.flow.approve_document(&world.importer_user, fixed.id).await.unwrap();
    assert!(review.promoted);
    assert_eq!(world.ptt(ptt.id).await.status, PttStatus::Redeemable);
    world.close().await;
}

#[tokio::test]
async fn no_required_documents_promotes_on_first_approval() {
    let world = TradeWorld::new().await;
    let ptt = world.issued().await;
    world.flow.lock_ptt(&world.importer_user, ptt.id, LockConditions::default()).await.unwrap();
    world.flow.transfer_ptt(&world.importer_user, ptt.id, world.exporter.id).await.unwrap();
    let doc = NewDocument::new(DocumentType::PackingList, "pl.pdf", "docs/pl");
    let doc = world.flow.upload_document(&world.exporter_user, ptt.id, doc).await.unwrap();
    let review = world.flow.approve_document(&world.importer_user, doc.id).await.unwrap();
    assert!(review.promoted);
    world.close().await;
}

#[tokio::test]
async fn cancellation_releases_credit() {
    let world = TradeWorld::new().await;
    let ptt = world.issued().await;
    assert_eq!(world.org(world.importer.id).await.credit_used, Money::from(FACE_VALUE));
    let err = world.flow.cancel_ptt(&world.banker, ptt.id, "").await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));
    let cancelled = world.flow.cancel_ptt(&world.banker, ptt.id, "Sanctions screening failed").await.unwrap();
    assert_eq!(cancelled.status, PttStatus::Cancelled);
    assert_eq!(world.org(world.importer.id).await.credit_used, Money::from(0));
    let ledger = world.db.fetch_ledger_for_ptt(ptt.id).await.unwrap();
    let last = ledger.last().unwrap();
    assert_eq!(last.kind, LedgerKind::Cancellation);
    assert_eq!(last.amount, Money::from(FACE_VALUE));
    assert_eq!(last.memo.as_deref(), Some("PTT cancelled: Sanctions screening failed"));

    let err = world.flow.issue_ptt(&world.banker, ptt.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Lifecycle(LifecycleError::IllegalTransition { .. })));

    let transferred = world.transferred().await;
    let err = world.flow.cancel_ptt(&world.importer_user, transferred.id, "changed my mind").await.unwrap_err();
    assert!(matches!(err, PttFlowError::Lifecycle(LifecycleError::IllegalTransition { .. })));
    world.close().await;
}

#[tokio::test]
async fn offers_on_the_marketplace() {
    let world = TradeWorld::new().await;
    let transferred = world.transferred().await;
    let err = world.flow.make_offer(&world.funder_user, transferred.id, Money::from(1_000)).await.unwrap_err();
    assert!(matches!(err, PttFlowError::UnexpectedStatus { .. }));

    let ptt = world.redeemable().await;
    let err = world.flow.make_offer(&world.funder_user, ptt.id, Money::from(FACE_VALUE + 1)).await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));
    let err = world.flow.make_offer(&world.importer_user, ptt.id, Money::from(FACE_VALUE)).await.unwrap_err();
    assert!(matches!(err, PttFlowError::InvalidRequest(_)));

    let low = world.flow.make_offer(&world.funder_user, ptt.id, Money::from(FACE_VALUE * 9 / 10)).await.unwrap();
    let high = world.flow.make_offer(&world.funder_user, ptt.id, Money::from(FACE_VALUE * 19 / 20)).await.unwrap();
    let spare = world.flow.make_offer(&world.funder_user, ptt.id, Money::from(FACE_VALUE * 4 / 5)).await.unwrap();
    let withdrawn = world.flow.withdraw_offer(&world.funder_user, spare.id).await.unwrap();
    assert_eq!(withdrawn.status, OfferStatus::Withdrawn);
    let err = world.flow.withdraw_offer(&world.exporter_user, low.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Forbidden(_)));

    let market = world.db.fetch_marketplace().await.unwrap();
    let listed = market.iter().find(|(p, _)| p.id == ptt.id).expect("token should be listed");
    assert_eq!(listed.1.len(), 2);

    let err = world.flow.accept_offer(&world.funder_user, high.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::Forbidden(_)));
    let accepted = world.flow.accept_offer(&world.exporter_user, high.id).await.unwrap();
    assert_eq!(accepted.rejected_offers, vec![low.id]);
    assert_eq!(world.db.fetch_offer(low.id).await.unwrap().unwrap().status, OfferStatus::Rejected);
    let err = world.flow.accept_offer(&world.funder_user, low.id).await.unwrap_err();
    assert!(matches!(err, PttFlowError::OfferNotOpen(_) | PttFlowError::Forbidden(_)));
    assert!(world.db.fetch_marketplace().await.unwrap().iter().all(|(p, _)| p.id != ptt.id));
    world.close().await;
}
