//! Saved address repository.

use sqlx::{FromRow, PgPool};

use hey_harvest_core::{AddressId, AddressType, UserId};

use super::{RepositoryError, parse_column};
use crate::models::{Address, AddressDetails};

const ADDRESS_COLUMNS: &str = "id, full_name, phone, line1, line2, landmark, city, state, \
                               pincode, address_type, is_default";

#[derive(Debug, FromRow)]
struct AddressRow {
    id: AddressId,
    full_name: String,
    phone: String,
    line1: String,
    line2: Option<String>,
    landmark: Option<String>,
    city: String,
    state: String,
    pincode: String,
    address_type: String,
    is_default: bool,
}

impl TryFrom<AddressRow> for Address {
    type Error = RepositoryError;

    fn try_from(row: AddressRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            address_type: parse_column(&row.address_type, "address_type")?,
            is_default: row.is_default,
            details: AddressDetails {
                full_name: row.full_name,
                phone: row.phone,
                line1: row.line1,
                line2: row.line2,
                landmark: row.landmark,
                city: row.city,
                state: row.state,
                pincode: row.pincode,
            },
        })
    }
}

/// Repository for a customer's saved addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(&format!(
            r"
            SELECT {ADDRESS_COLUMNS}
            FROM storefront.address
            WHERE user_id = $1
            ORDER BY is_default DESC, created_at
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Address::try_from).collect()
    }

    /// Save a new address. The first address, or one flagged default,
    /// becomes the default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user_id: UserId,
        details: &AddressDetails,
        address_type: AddressType,
        is_default: bool,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (existing,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM storefront.address WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
        let make_default = is_default || existing == 0;

        if make_default {
            clear_default(&mut tx, user_id).await?;
        }

        let row: AddressRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storefront.address
                (user_id, full_name, phone, line1, line2, landmark, city, state, pincode,
                 address_type, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(&details.full_name)
        .bind(&details.phone)
        .bind(&details.line1)
        .bind(&details.line2)
        .bind(&details.landmark)
        .bind(&details.city)
        .bind(&details.state)
        .bind(&details.pincode)
        .bind(address_type.as_str())
        .bind(make_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Address::try_from(row)
    }

    /// Replace an address's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't belong to the user.
    pub async fn update(
        &self,
        user_id: UserId,
        id: AddressId,
        details: &AddressDetails,
        address_type: AddressType,
    ) -> Result<Address, RepositoryError> {
        let row: Option<AddressRow> = sqlx::query_as(&format!(
            r"
            UPDATE storefront.address
            SET full_name = $3, phone = $4, line1 = $5, line2 = $6, landmark = $7,
                city = $8, state = $9, pincode = $10, address_type = $11, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {ADDRESS_COLUMNS}
            "
        ))
        .bind(id)
        .bind(user_id)
        .bind(&details.full_name)
        .bind(&details.phone)
        .bind(&details.line1)
        .bind(&details.line2)
        .bind(&details.landmark)
        .bind(&details.city)
        .bind(&details.state)
        .bind(&details.pincode)
        .bind(address_type.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(Address::try_from)
    }

    /// Delete an address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't belong to the user.
    pub async fn delete(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.address WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Make one address the default, clearing the flag on the others.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't belong to the user.
    pub async fn set_default(&self, user_id: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        clear_default(&mut tx, user_id).await?;

        let result = sqlx::query(
            r"
            UPDATE storefront.address
            SET is_default = TRUE, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}

async fn clear_default(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE storefront.address SET is_default = FALSE WHERE user_id = $1 AND is_default",
    )
    .bind(user_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
