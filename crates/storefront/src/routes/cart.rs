//! Cart route handlers.
//!
//! Every request loads the visitor's cart from the session, runs at most one
//! command against a fresh [`CartStore`], and flushes the session afterwards.
//! Two concurrent requests on the same session resolve last-writer-wins.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;
use sillage_core::{
    CartCommand, CartLine, CartLineInput, CartOutcome, CartStore, CartTotals, CurrencyCode,
    format_amount,
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::services::SessionCartStorage;
use crate::state::AppState;

// =============================================================================
// Views
// =============================================================================

/// One cart line as rendered for UI consumers.
#[derive(Debug, Clone, Serialize)]
pub struct LineView {
    pub id: String,
    pub name: String,
    pub subtitle: String,
    pub size: String,
    pub image: String,
    pub slug: String,
    pub price: String,
    pub quantity: u32,
    pub line_total: String,
}

/// Derived cart amounts, rounded to two decimal places.
#[derive(Debug, Clone, Serialize)]
pub struct TotalsView {
    pub item_count: u32,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub free_shipping_remaining: String,
    pub currency_code: &'static str,
}

/// The full cart: lines plus totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<LineView>,
    #[serde(flatten)]
    pub totals: TotalsView,
}

/// What a mutation did, for UI feedback.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeView {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response body of every cart mutation.
#[derive(Debug, Clone, Serialize)]
pub struct CartResponse {
    pub outcome: OutcomeView,
    pub cart: CartView,
}

/// Response body of `GET /cart/count`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CountView {
    pub count: u32,
}

// =============================================================================
// Type Conversions
// =============================================================================

impl From<&CartLine> for LineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id.to_string(),
            name: line.name.clone(),
            subtitle: line.subtitle.clone(),
            size: line.size.clone(),
            image: line.image.clone(),
            slug: line.slug.clone(),
            price: format_amount(line.unit_price),
            quantity: line.quantity,
            line_total: format_amount(line.line_total()),
        }
    }
}

impl TotalsView {
    fn new(totals: &CartTotals, currency: CurrencyCode) -> Self {
        Self {
            item_count: totals.item_count,
            subtotal: format_amount(totals.subtotal),
            shipping: format_amount(totals.shipping),
            tax: format_amount(totals.tax),
            total: format_amount(totals.total),
            free_shipping_remaining: format_amount(totals.free_shipping_remaining),
            currency_code: currency.code(),
        }
    }
}

impl CartView {
    fn new(store: &CartStore<&mut SessionCartStorage>, currency: CurrencyCode) -> Self {
        Self {
            lines: store.lines().iter().map(LineView::from).collect(),
            totals: TotalsView::new(&store.totals(), currency),
        }
    }
}

impl From<&CartOutcome> for OutcomeView {
    fn from(outcome: &CartOutcome) -> Self {
        Self {
            status: outcome.as_str(),
            message: outcome.message(),
        }
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub id: String,
    /// Any JSON number; the cart clamps it into range.
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: i64,
}

fn deserialize_quantity<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Number::deserialize(deserializer).map(|n| quantity_from_number(&n))
}

/// Map a JSON number onto `i64`: fractions are floored and magnitudes beyond
/// the `i64` range saturate at its bounds.
#[allow(clippy::cast_possible_truncation)] // `as` saturates, which is the intent
fn quantity_from_number(n: &Number) -> i64 {
    if let Some(i) = n.as_i64() {
        return i;
    }
    if n.as_u64().is_some() {
        return i64::MAX;
    }
    n.as_f64().map_or(0, |f| f.floor() as i64)
}

/// Remove line request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub id: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Read-only view of the visitor's cart.
async fn read_cart<T>(
    state: &AppState,
    session: &Session,
    render: impl FnOnce(&CartStore<&mut SessionCartStorage>) -> T,
) -> T {
    let mut storage = SessionCartStorage::load(session).await;
    let view = render(&CartStore::hydrate(&mut storage, state.pricing()));
    // Hydration may have removed a corrupt record
    storage.flush(session).await;
    view
}

/// Apply one command to the visitor's cart and persist it to the session.
async fn mutate_cart(state: &AppState, session: &Session, command: CartCommand) -> CartResponse {
    let mut storage = SessionCartStorage::load(session).await;

    let response = {
        let mut store = CartStore::hydrate(&mut storage, state.pricing());
        let outcome = store.dispatch(command);
        if !outcome.mutated() {
            tracing::debug!(outcome = outcome.as_str(), "Cart command had no effect");
        }

        CartResponse {
            outcome: OutcomeView::from(&outcome),
            cart: CartView::new(&store, state.currency()),
        }
    };

    storage.flush(session).await;
    response
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Json<CartView> {
    let currency = state.currency();
    Json(read_cart(&state, &session, |store| CartView::new(store, currency)).await)
}

/// Number of items in the cart (for a badge).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Json<CountView> {
    Json(
        read_cart(&state, &session, |store| CountView {
            count: store.item_count(),
        })
        .await,
    )
}

/// Totals only, for the checkout flow.
#[instrument(skip(state, session))]
pub async fn totals(State(state): State<AppState>, session: Session) -> Json<TotalsView> {
    let currency = state.currency();
    Json(
        read_cart(&state, &session, |store| {
            TotalsView::new(&store.totals(), currency)
        })
        .await,
    )
}

/// Add a line to the cart, or bump its quantity.
#[instrument(skip(state, session, payload))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<CartLineInput>, JsonRejection>,
) -> Result<Json<CartResponse>> {
    let Json(input) = payload?;

    add_breadcrumb("cart", "Add to cart", Some(&[("line_id", input.id.as_str())]));

    Ok(Json(
        mutate_cart(&state, &session, CartCommand::Add(input)).await,
    ))
}

/// Set a line's quantity.
#[instrument(skip(state, session, payload))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<UpdateCartRequest>, JsonRejection>,
) -> Result<Json<CartResponse>> {
    let Json(form) = payload?;

    let quantity = form.quantity.to_string();
    add_breadcrumb(
        "cart",
        "Update cart quantity",
        Some(&[("line_id", form.id.as_str()), ("quantity", quantity.as_str())]),
    );

    let command = CartCommand::SetQuantity {
        id: form.id,
        quantity: form.quantity,
    };
    Ok(Json(mutate_cart(&state, &session, command).await))
}

/// Remove a line from the cart.
#[instrument(skip(state, session, payload))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    payload: std::result::Result<Json<RemoveFromCartRequest>, JsonRejection>,
) -> Result<Json<CartResponse>> {
    let Json(form) = payload?;

    add_breadcrumb("cart", "Remove from cart", Some(&[("line_id", form.id.as_str())]));

    let command = CartCommand::Remove { id: form.id };
    Ok(Json(mutate_cart(&state, &session, command).await))
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Json<CartResponse> {
    add_breadcrumb("cart", "Clear cart", None);

    Json(mutate_cart(&state, &session, CartCommand::Clear).await)
}
