//! Shipping document metadata. The files themselves live in an external object store.
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{DocumentStatus, DocumentType, NewDocument, ShippingDocument},
    traits::PttFlowError,
};

pub async fn insert_document(
    ptt_id: i64,
    uploaded_by: i64,
    document: NewDocument,
    conn: &mut SqliteConnection,
) -> Result<ShippingDocument, sqlx::Error> {
    let doc: ShippingDocument = sqlx::query_as(
        r#"
            INSERT INTO shipping_documents (ptt_id, document_type, file_name, storage_ref, uploaded_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(ptt_id)
    .bind(document.document_type)
    .bind(document.file_name)
    .bind(document.storage_ref)
    .bind(uploaded_by)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Document #{} ({}) recorded for PTT #{ptt_id}", doc.id, doc.document_type);
    Ok(doc)
}

pub async fn fetch_document(doc_id: i64, conn: &mut SqliteConnection) -> Result<Option<ShippingDocument>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shipping_documents WHERE id = $1").bind(doc_id).fetch_optional(conn).await
}

pub async fn fetch_documents_for_ptt(
    ptt_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ShippingDocument>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM shipping_documents WHERE ptt_id = $1 ORDER BY id ASC")
        .bind(ptt_id)
        .fetch_all(conn)
        .await
}

/// Moves a `pending` document to `approved` or `rejected`. Documents that were already reviewed are left alone and
/// an error is returned.
pub async fn set_document_status(
    doc_id: i64,
    status: DocumentStatus,
    reason: Option<String>,
    conn: &mut SqliteConnection,
) -> Result<ShippingDocument, PttFlowError> {
    let doc: Option<ShippingDocument> = sqlx::query_as(
        r#"
            UPDATE shipping_documents SET
                status = $1,
                rejection_reason = $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $3 AND status = 'pending'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(reason)
    .bind(doc_id)
    .fetch_optional(conn)
    .await?;
    doc.ok_or(PttFlowError::DocumentAlreadyReviewed(doc_id))
}

/// The distinct document types that have at least one approved document for the token.
pub async fn approved_types(ptt_id: i64, conn: &mut SqliteConnection) -> Result<Vec<DocumentType>, sqlx::Error> {
    let rows: Vec<(DocumentType,)> = sqlx::query_as(
        "SELECT DISTINCT document_type FROM shipping_documents WHERE ptt_id = $1 AND status = 'approved'",
    )
    .bind(ptt_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(t,)| t).collect())
}
