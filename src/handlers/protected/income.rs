// handlers/protected/income.rs - /income, /income/latest, /income/:id

use axum::extract::State;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{ApiPath, ApiQuery, JsonBody, ListQuery};
use crate::app::AppState;
use crate::database::models::{Income, IncomePatch, RecordIncome};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// Body of POST /income. `amount` is taken as raw JSON so a non-number gets
/// its own message instead of a generic decode error.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordIncomeBody {
    #[serde(default)]
    pub amount: Value,
    #[serde(default)]
    pub savings_goal: Option<f64>,
    #[serde(default)]
    pub month: Option<i16>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl TryFrom<RecordIncomeBody> for RecordIncome {
    type Error = ApiError;

    fn try_from(body: RecordIncomeBody) -> Result<Self, Self::Error> {
        let amount = body
            .amount
            .as_f64()
            .ok_or_else(|| ApiError::bad_request("amount must be a number"))?;
        Ok(RecordIncome {
            amount,
            savings_goal: body.savings_goal,
            month: body.month,
            year: body.year,
        })
    }
}

/// GET /income - All of the caller's income records
pub async fn list(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Income>> {
    let order = query.order::<Income>()?;
    let incomes = state.incomes.list(ctx.principal_id, order).await?;
    Ok(ApiResponse::ok(incomes))
}

/// POST /income - Create or overwrite the record for (month, year)
pub async fn record(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    JsonBody(body): JsonBody<RecordIncomeBody>,
) -> ApiResult<Income> {
    let input = RecordIncome::try_from(body)?;
    let income = state.income_ledger.record_income(ctx.principal_id, input).await?;
    Ok(ApiResponse::created(income))
}

/// GET /income/latest - Most recently created record, 404 when there is none
pub async fn latest(State(state): State<AppState>, AuthUser(ctx): AuthUser) -> ApiResult<Income> {
    let income = state.income_ledger.latest(ctx.principal_id).await?;
    Ok(ApiResponse::ok(income))
}

/// GET /income/:id
pub async fn get(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Income> {
    let income = state.incomes.find(ctx.principal_id, id).await?;
    Ok(ApiResponse::ok(income))
}

/// PUT /income/:id - Partial update; moving onto an occupied period is rejected
pub async fn update(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    JsonBody(patch): JsonBody<IncomePatch>,
) -> ApiResult<Income> {
    let income = state.incomes.update(ctx.principal_id, id, patch).await?;
    Ok(ApiResponse::ok(income))
}

/// DELETE /income/:id
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    state.incomes.delete(ctx.principal_id, id).await?;
    Ok(ApiResponse::ok(json!({ "message": "Income deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(raw: &str) -> RecordIncomeBody {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn non_numeric_amount_is_rejected() {
        for raw in [r#"{"amount": "100"}"#, r#"{}"#, r#"{"amount": null}"#, r#"{"amount": [1]}"#] {
            let err = RecordIncome::try_from(body(raw)).unwrap_err();
            assert_eq!(err.message(), "amount must be a number", "{}", raw);
        }
    }

    #[test]
    fn integer_and_float_amounts_are_accepted() {
        let input = RecordIncome::try_from(body(r#"{"amount": 2500, "month": 1, "year": 2024}"#)).unwrap();
        assert_eq!(input.amount, 2500.0);
        assert_eq!(input.month, Some(1));
        assert_eq!(input.savings_goal, None);

        let input = RecordIncome::try_from(body(r#"{"amount": 12.5, "savingsGoal": 3}"#)).unwrap();
        assert_eq!(input.savings_goal, Some(3.0));
    }
}
