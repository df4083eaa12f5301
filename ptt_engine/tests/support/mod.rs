#![allow(dead_code)]
pub mod prepare_env;

use chrono::{Days, Utc};
use ptt_engine::{
    db_types::{
        Actor,
        BackingType,
        DocumentType,
        LockConditions,
        Money,
        NewDocument,
        NewOrganization,
        NewPttRequest,
        NewUser,
        OrgType,
        Organization,
        PttToken,
        Role,
    },
    events::EventProducers,
    AccountManagement,
    AuthApi,
    PttDatabase,
    PttFlowApi,
    SqliteDatabase,
};

use self::prepare_env::{prepare_test_env, random_db_path};

pub const TREASURY: i64 = 100_000_000;
pub const CREDIT_LIMIT: i64 = 25_000_000;
pub const FACE_VALUE: i64 = 10_000_000;

/// A bank, an importer, an exporter and a funder, each with a plain user, plus an operator admin and a maker and
/// checker at the bank.
pub struct TradeWorld {
    pub db: SqliteDatabase,
    pub flow: PttFlowApi<SqliteDatabase>,
    pub bank: Organization,
    pub importer: Organization,
    pub exporter: Organization,
    pub funder: Organization,
    pub admin: Actor,
    pub banker: Actor,
    pub bank_maker: Actor,
    pub bank_checker: Actor,
    pub importer_user: Actor,
    pub importer_maker: Actor,
    pub exporter_user: Actor,
    pub funder_user: Actor,
}

async fn org(db: &SqliteDatabase, org: NewOrganization) -> Organization {
    db.insert_organization(org).await.expect("Error creating organization")
}

async fn user(auth: &AuthApi<SqliteDatabase>, org_id: i64, name: &str, roles: Vec<Role>) -> Actor {
    let user = NewUser { org_id, name: name.to_string(), email: None, roles };
    let (account, key) = auth.create_user(user).await.expect("Error creating user");
    let actor = auth.authenticate(key.reveal()).await.expect("Fresh key did not authenticate");
    assert_eq!(actor.user_id, account.id);
    actor
}

impl TradeWorld {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default()).await
    }

    pub async fn with_producers(producers: EventProducers) -> Self {
        let db = prepare_test_env(&random_db_path()).await;
        let operator = org(&db, NewOrganization::new("PTT operator", OrgType::Operator)).await;
        let bank = org(&db, NewOrganization::new("Harbour Bank", OrgType::Bank).with_treasury(Money::from(TREASURY))).await;
        let importer = org(
            &db,
            NewOrganization::new("Acme Imports", OrgType::Importer).with_credit_limit(Money::from(CREDIT_LIMIT)),
        )
        .await;
        let exporter = org(&db, NewOrganization::new("Orchard Exports", OrgType::Exporter)).await;
        let funder =
            org(&db, NewOrganization::new("Lighthouse Capital", OrgType::Funder).with_treasury(Money::from(TREASURY)))
                .await;
        let auth = AuthApi::new(db.clone());
        let admin = user(&auth, operator.id, "root", vec![Role::Admin]).await;
        let banker = user(&auth, bank.id, "banker", vec![]).await;
        let bank_maker = user(&auth, bank.id, "maker", vec![Role::Maker]).await;
        let bank_checker = user(&auth, bank.id, "checker", vec![Role::Checker]).await;
        let importer_user = user(&auth, importer.id, "importer", vec![]).await;
        let importer_maker = user(&auth, importer.id, "importer maker", vec![Role::Maker]).await;
        let exporter_user = user(&auth, exporter.id, "exporter", vec![]).await;
        let funder_user = user(&auth, funder.id, "funder", vec![]).await;
        let flow = PttFlowApi::new(db.clone(), producers);
        Self {
            db,
            flow,
            bank,
            importer,
            exporter,
            funder,
            admin,
            banker,
            bank_maker,
            bank_checker,
            importer_user,
            importer_maker,
            exporter_user,
            funder_user,
        }
    }

    pub fn request(&self, amount: i64, backing: BackingType) -> NewPttRequest {
        let maturity = Utc::now().date_naive().checked_add_days(Days::new(90)).expect("date overflow");
        NewPttRequest::new(Money::from(amount), maturity, backing, self.bank.id)
    }

    pub async fn org(&self, org_id: i64) -> Organization {
        self.db.fetch_organization(org_id).await.expect("Error fetching organization").expect("No such organization")
    }

    pub async fn ptt(&self, ptt_id: i64) -> PttToken {
        self.db.fetch_ptt(ptt_id).await.expect("Error fetching token").expect("No such token")
    }

    pub async fn requested(&self) -> PttToken {
        let req = self.request(FACE_VALUE, BackingType::Credit);
        self.flow.request_ptt(&self.importer_user, req).await.expect("Error requesting PTT")
    }

    pub async fn issued(&self) -> PttToken {
        let ptt = self.requested().await;
        self.flow.issue_ptt(&self.banker, ptt.id).await.expect("Error issuing PTT")
    }

    pub async fn transferred(&self) -> PttToken {
        let ptt = self.issued().await;
        let conditions = LockConditions::new(vec![DocumentType::BillOfLading, DocumentType::CommercialInvoice]);
        self.flow.lock_ptt(&self.importer_user, ptt.id, conditions).await.expect("Error locking PTT");
        self.flow.transfer_ptt(&self.importer_user, ptt.id, self.exporter.id).await.expect("Error transferring PTT")
    }

    pub async fn redeemable(&self) -> PttToken {
        let ptt = self.transferred().await;
        for doc_type in [DocumentType::BillOfLading, DocumentType::CommercialInvoice] {
            let doc = NewDocument::new(doc_type, format!("{doc_type}.pdf"), format!("store/{}/{doc_type}", ptt.id));
            let doc = self.flow.upload_document(&self.exporter_user, ptt.id, doc).await.expect("Error uploading");
            self.flow.approve_document(&self.importer_user, doc.id).await.expect("Error approving document");
        }
        self.ptt(ptt.id).await
    }

    pub async fn close(self) {
        prepare_env::tear_down(self.db).await;
    }
}
