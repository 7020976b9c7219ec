//! Actor bootstrap: the very first admin registers without an authenticated caller.

use crate::error::AppError;
use crate::model::{Admin, DocMeta, NewActor, Resource, Validate};
use crate::store::DocumentStore;
use chrono::Utc;
use uuid::Uuid;

/// Register the first admin, self-created. Once any admin exists, further admins
/// must be created by an authenticated admin through the regular create path.
pub async fn register_first_admin(store: &dyn DocumentStore, mut req: NewActor) -> Result<Admin, AppError> {
    req.normalize();
    req.validate()?;
    if store.count(Admin::COLLECTION).await? > 0 {
        return Err(AppError::Forbidden(
            "an admin already exists; ask an admin to create your account".into(),
        ));
    }
    let id = Uuid::new_v4();
    let admin = Admin::build(
        req,
        DocMeta {
            id,
            created_by: id,
            now: Utc::now(),
        },
    );
    store
        .insert(Admin::COLLECTION, id, serde_json::to_value(&admin)?)
        .await?;
    tracing::info!(%id, "first admin registered");
    Ok(admin)
}
