//! crates/guroosh_core/src/ledger.rs
//!
//! Personal ledger entries (expenses, incomes, budgets, goals, categories) and the
//! arithmetic over them: budget progress and income/expense overviews.
//!
//! Every entry kind implements [`LedgerEntry`], which lets the storage layer keep
//! them all as owner-scoped documents and lets the web layer serve them through
//! one set of generic CRUD handlers.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::not_blank;
use crate::ports::{LedgerDocument, LedgerStore, PortError, PortResult};

/// A document owned by a single user and stored in the ledger.
pub trait LedgerEntry: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The storage discriminator, e.g. `"expense"`.
    const KIND: &'static str;
    /// Human readable name used in error messages.
    const LABEL: &'static str;

    type Draft: DeserializeOwned + Validate + Send + 'static;
    type Patch: DeserializeOwned + Validate + Send + 'static;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;
    /// The date the entry is filed under; lists are ordered and filtered by it.
    fn occurred_at(&self) -> DateTime<Utc>;
    fn from_draft(owner_id: Uuid, draft: Self::Draft, now: DateTime<Utc>) -> Self;
    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>);

    /// Whether two entries of the same owner may not coexist.
    fn conflicts_with(&self, _other: &Self) -> bool {
        false
    }
}

/// Typed access to the documents of one entry kind.
pub struct Ledger<'a, T> {
    store: &'a dyn LedgerStore,
    entry: PhantomData<fn() -> T>,
}

impl<'a, T: LedgerEntry> Ledger<'a, T> {
    pub fn new(store: &'a dyn LedgerStore) -> Self {
        Self {
            store,
            entry: PhantomData,
        }
    }

    pub async fn insert(&self, entry: T) -> PortResult<T> {
        self.store.insert_document(encode(&entry)?).await?;
        Ok(entry)
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> PortResult<T> {
        let document = self
            .store
            .get_document(T::KIND, owner_id, id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => PortError::NotFound(format!("{} not found", T::LABEL)),
                other => other,
            })?;
        decode(document)
    }

    /// All entries of the owner, most recent first.
    pub async fn list(&self, owner_id: Uuid) -> PortResult<Vec<T>> {
        let documents = self.store.list_documents(T::KIND, owner_id).await?;
        let mut entries = documents.into_iter().map(decode).collect::<PortResult<Vec<T>>>()?;
        entries.sort_by(|a, b| b.occurred_at().cmp(&a.occurred_at()));
        Ok(entries)
    }

    pub async fn update(&self, entry: T) -> PortResult<T> {
        self.store.replace_document(encode(&entry)?).await?;
        Ok(entry)
    }

    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> PortResult<()> {
        self.store
            .delete_document(T::KIND, owner_id, id)
            .await
            .map_err(|e| match e {
                PortError::NotFound(_) => PortError::NotFound(format!("{} not found", T::LABEL)),
                other => other,
            })
    }
}

fn encode<T: LedgerEntry>(entry: &T) -> PortResult<LedgerDocument> {
    let body = serde_json::to_value(entry).map_err(|e| PortError::Unexpected(e.to_string()))?;
    Ok(LedgerDocument {
        id: entry.id(),
        owner_id: entry.owner_id(),
        kind: T::KIND.to_string(),
        occurred_at: entry.occurred_at(),
        body,
    })
}

fn decode<T: LedgerEntry>(document: LedgerDocument) -> PortResult<T> {
    serde_json::from_value(document.body).map_err(|e| {
        PortError::Unexpected(format!("Corrupt {} document {}: {}", T::KIND, document.id, e))
    })
}

/// Keeps entries whose date falls in `[from, to]`; open bounds are ignored.
pub fn within<T: LedgerEntry>(
    entries: Vec<T>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<T> {
    entries
        .into_iter()
        .filter(|e| from.map_or(true, |f| e.occurred_at() >= f))
        .filter(|e| to.map_or(true, |t| e.occurred_at() <= t))
        .collect()
}

fn trimmed(value: String) -> String {
    value.trim().to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(trimmed).filter(|v| !v.is_empty())
}

//=========================================================================================
// Categories
//=========================================================================================

text_enum! {
    pub enum CategoryKind {
        Expense => "expense",
        Income => "income",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    #[validate(
        length(max = 50, message = "Name must be between 1 and 50 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: String,
    pub kind: Option<CategoryKind>,
    #[validate(length(max = 20, message = "Color is too long"))]
    pub color: Option<String>,
    #[validate(length(max = 50, message = "Icon is too long"))]
    pub icon: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[validate(
        length(max = 50, message = "Name must be between 1 and 50 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: Option<String>,
    #[validate(length(max = 20, message = "Color is too long"))]
    pub color: Option<String>,
    #[validate(length(max = 50, message = "Icon is too long"))]
    pub icon: Option<String>,
}

impl LedgerEntry for Category {
    const KIND: &'static str = "category";
    const LABEL: &'static str = "Category";
    type Draft = NewCategory;
    type Patch = CategoryPatch;

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(owner_id: Uuid, draft: NewCategory, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: owner_id,
            name: trimmed(draft.name),
            kind: draft.kind.unwrap_or(CategoryKind::Expense),
            color: non_blank(draft.color),
            icon: non_blank(draft.icon),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: CategoryPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = trimmed(name);
        }
        if patch.color.is_some() {
            self.color = non_blank(patch.color);
        }
        if patch.icon.is_some() {
            self.icon = non_blank(patch.icon);
        }
        self.updated_at = now;
    }

    fn conflicts_with(&self, other: &Self) -> bool {
        self.id != other.id && self.kind == other.kind && self.name.eq_ignore_ascii_case(&other.name)
    }
}

//=========================================================================================
// Expenses and incomes
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub category: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[validate(
        length(max = 50, message = "Category is too long"),
        custom(function = "not_blank", message = "Category is required")
    )]
    pub category: String,
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 50, message = "Payment method is too long"))]
    pub payment_method: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: Option<f64>,
    #[validate(
        length(max = 50, message = "Category is too long"),
        custom(function = "not_blank", message = "Category is required")
    )]
    pub category: Option<String>,
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[validate(length(max = 50, message = "Payment method is too long"))]
    pub payment_method: Option<String>,
}

impl LedgerEntry for Expense {
    const KIND: &'static str = "expense";
    const LABEL: &'static str = "Expense";
    type Draft = NewExpense;
    type Patch = ExpensePatch;

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.date
    }

    fn from_draft(owner_id: Uuid, draft: NewExpense, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: owner_id,
            amount: draft.amount,
            category: trimmed(draft.category),
            description: non_blank(draft.description),
            date: draft.date.unwrap_or(now),
            payment_method: non_blank(draft.payment_method),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: ExpensePatch, now: DateTime<Utc>) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(category) = patch.category {
            self.category = trimmed(category);
        }
        if patch.description.is_some() {
            self.description = non_blank(patch.description);
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if patch.payment_method.is_some() {
            self.payment_method = non_blank(patch.payment_method);
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Income {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: f64,
    pub source: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub recurring: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewIncome {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[validate(
        length(max = 100, message = "Source is too long"),
        custom(function = "not_blank", message = "Source is required")
    )]
    pub source: String,
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurring: bool,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IncomePatch {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: Option<f64>,
    #[validate(
        length(max = 100, message = "Source is too long"),
        custom(function = "not_blank", message = "Source is required")
    )]
    pub source: Option<String>,
    #[validate(length(max = 500, message = "Description is too long"))]
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub recurring: Option<bool>,
}

impl LedgerEntry for Income {
    const KIND: &'static str = "income";
    const LABEL: &'static str = "Income";
    type Draft = NewIncome;
    type Patch = IncomePatch;

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.date
    }

    fn from_draft(owner_id: Uuid, draft: NewIncome, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: owner_id,
            amount: draft.amount,
            source: trimmed(draft.source),
            description: non_blank(draft.description),
            date: draft.date.unwrap_or(now),
            recurring: draft.recurring,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: IncomePatch, now: DateTime<Utc>) {
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(source) = patch.source {
            self.source = trimmed(source);
        }
        if patch.description.is_some() {
            self.description = non_blank(patch.description);
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(recurring) = patch.recurring {
            self.recurring = recurring;
        }
        self.updated_at = now;
    }
}

//=========================================================================================
// Budgets
//=========================================================================================

text_enum! {
    pub enum BudgetPeriod {
        Weekly => "weekly",
        Monthly => "monthly",
        Yearly => "yearly",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category: String,
    pub amount: f64,
    pub period: BudgetPeriod,
    pub start_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBudget {
    #[validate(
        length(max = 50, message = "Category is too long"),
        custom(function = "not_blank", message = "Category is required")
    )]
    pub category: String,
    #[validate(range(exclusive_min = 0.0, message = "Budget amount must be greater than zero"))]
    pub amount: f64,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPatch {
    #[validate(
        length(max = 50, message = "Category is too long"),
        custom(function = "not_blank", message = "Category is required")
    )]
    pub category: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Budget amount must be greater than zero"))]
    pub amount: Option<f64>,
    pub period: Option<BudgetPeriod>,
    pub start_date: Option<DateTime<Utc>>,
}

impl LedgerEntry for Budget {
    const KIND: &'static str = "budget";
    const LABEL: &'static str = "Budget";
    type Draft = NewBudget;
    type Patch = BudgetPatch;

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.start_date
    }

    fn from_draft(owner_id: Uuid, draft: NewBudget, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: owner_id,
            category: trimmed(draft.category),
            amount: draft.amount,
            period: draft.period.unwrap_or(BudgetPeriod::Monthly),
            start_date: draft.start_date.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: BudgetPatch, now: DateTime<Utc>) {
        if let Some(category) = patch.category {
            self.category = trimmed(category);
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(period) = patch.period {
            self.period = period;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        self.updated_at = now;
    }
}

impl Budget {
    /// The period window `[start, end)` that contains `now`.
    ///
    /// Windows repeat from `start_date`; before the start date the first window is used.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self.period {
            BudgetPeriod::Weekly => {
                let week = Duration::days(7);
                let elapsed = (now - self.start_date).num_seconds().max(0);
                let periods = elapsed / week.num_seconds();
                let start = self.start_date + Duration::days(7 * periods);
                (start, start + week)
            }
            BudgetPeriod::Monthly => self.month_window(now, 1),
            BudgetPeriod::Yearly => self.month_window(now, 12),
        }
    }

    fn month_window(&self, now: DateTime<Utc>, step: u32) -> (DateTime<Utc>, DateTime<Utc>) {
        let add = |months: u32| {
            self.start_date
                .checked_add_months(Months::new(months))
                .unwrap_or(self.start_date)
        };
        if now <= self.start_date {
            return (self.start_date, add(step));
        }
        let months_apart = (month_index(&now) - month_index(&self.start_date)).max(0) as u32;
        let mut periods = months_apart / step;
        if add(periods * step) > now && periods > 0 {
            periods -= 1;
        }
        (add(periods * step), add((periods + 1) * step))
    }
}

fn month_index(date: &DateTime<Utc>) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProgress {
    pub budget: Budget,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub spent: f64,
    pub remaining: f64,
    pub percent_used: f64,
    pub exceeded: bool,
}

/// Sums the expenses of the budget's category inside its current window.
pub fn budget_progress(budget: &Budget, expenses: &[Expense], now: DateTime<Utc>) -> BudgetProgress {
    let (period_start, period_end) = budget.window(now);
    let spent: f64 = expenses
        .iter()
        .filter(|e| e.category.eq_ignore_ascii_case(&budget.category))
        .filter(|e| e.date >= period_start && e.date < period_end)
        .map(|e| e.amount)
        .sum();
    let percent_used = if budget.amount > 0.0 {
        spent * 100.0 / budget.amount
    } else {
        0.0
    };
    BudgetProgress {
        budget: budget.clone(),
        period_start,
        period_end,
        spent,
        remaining: budget.amount - spent,
        percent_used,
        exceeded: spent > budget.amount,
    }
}

//=========================================================================================
// Goals
//=========================================================================================

text_enum! {
    pub enum GoalStatus {
        Active => "active",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    pub deadline: Option<DateTime<Utc>>,
    pub status: GoalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    #[validate(
        length(max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: String,
    #[validate(range(exclusive_min = 0.0, message = "Target amount must be greater than zero"))]
    pub target_amount: f64,
    #[validate(range(min = 0.0, message = "Current amount cannot be negative"))]
    pub current_amount: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GoalPatch {
    #[validate(
        length(max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Target amount must be greater than zero"))]
    pub target_amount: Option<f64>,
    #[validate(range(min = 0.0, message = "Current amount cannot be negative"))]
    pub current_amount: Option<f64>,
    pub deadline: Option<DateTime<Utc>>,
    pub status: Option<GoalStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct Contribution {
    #[validate(range(exclusive_min = 0.0, message = "Contribution must be greater than zero"))]
    pub amount: f64,
}

impl Goal {
    pub fn contribute(&mut self, amount: f64, now: DateTime<Utc>) {
        self.current_amount += amount;
        self.updated_at = now;
        self.settle();
    }

    pub fn progress_percent(&self) -> f64 {
        if self.target_amount > 0.0 {
            (self.current_amount * 100.0 / self.target_amount).min(100.0)
        } else {
            0.0
        }
    }

    fn settle(&mut self) {
        if self.status == GoalStatus::Active && self.current_amount >= self.target_amount {
            self.status = GoalStatus::Completed;
        }
    }
}

impl LedgerEntry for Goal {
    const KIND: &'static str = "goal";
    const LABEL: &'static str = "Goal";
    type Draft = NewGoal;
    type Patch = GoalPatch;

    fn id(&self) -> Uuid {
        self.id
    }
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn from_draft(owner_id: Uuid, draft: NewGoal, now: DateTime<Utc>) -> Self {
        let mut goal = Self {
            id: Uuid::new_v4(),
            user_id: owner_id,
            name: trimmed(draft.name),
            target_amount: draft.target_amount,
            current_amount: draft.current_amount.unwrap_or(0.0),
            deadline: draft.deadline,
            status: GoalStatus::Active,
            created_at: now,
            updated_at: now,
        };
        goal.settle();
        goal
    }

    fn apply_patch(&mut self, patch: GoalPatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name {
            self.name = trimmed(name);
        }
        if let Some(target) = patch.target_amount {
            self.target_amount = target;
        }
        if let Some(current) = patch.current_amount {
            self.current_amount = current;
        }
        if patch.deadline.is_some() {
            self.deadline = patch.deadline;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
        self.settle();
    }
}

//=========================================================================================
// Overview
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceOverview {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net: f64,
    pub expenses_by_category: Vec<CategoryTotal>,
}

/// Totals over already date-filtered incomes and expenses. Categories are
/// grouped case-insensitively and listed by descending total.
pub fn overview(incomes: &[Income], expenses: &[Expense]) -> FinanceOverview {
    let total_income: f64 = incomes.iter().map(|i| i.amount).sum();
    let total_expenses: f64 = expenses.iter().map(|e| e.amount).sum();

    let mut grouped: BTreeMap<String, CategoryTotal> = BTreeMap::new();
    for expense in expenses {
        grouped
            .entry(expense.category.to_lowercase())
            .or_insert_with(|| CategoryTotal {
                category: expense.category.clone(),
                total: 0.0,
            })
            .total += expense.amount;
    }
    let mut expenses_by_category: Vec<CategoryTotal> = grouped.into_values().collect();
    expenses_by_category.sort_by(|a, b| b.total.total_cmp(&a.total));

    FinanceOverview {
        total_income,
        total_expenses,
        net: total_income - total_expenses,
        expenses_by_category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn whitespace_only_labels_fail_validation() {
        let blank = NewCategory {
            name: " \t ".to_string(),
            kind: None,
            color: None,
            icon: None,
        };
        let errors = blank.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));

        let patch = ExpensePatch {
            category: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        assert!(ExpensePatch::default().validate().is_ok());
    }

    fn expense(category: &str, amount: f64, date: DateTime<Utc>) -> Expense {
        Expense::from_draft(
            Uuid::nil(),
            NewExpense {
                amount,
                category: category.to_string(),
                description: None,
                date: Some(date),
                payment_method: None,
            },
            date,
        )
    }

    fn monthly_budget(category: &str, amount: f64, start: DateTime<Utc>) -> Budget {
        Budget::from_draft(
            Uuid::nil(),
            NewBudget {
                category: category.to_string(),
                amount,
                period: Some(BudgetPeriod::Monthly),
                start_date: Some(start),
            },
            start,
        )
    }

    #[test]
    fn monthly_window_contains_now() {
        let budget = monthly_budget("Food", 1000.0, at(2024, 1, 15));
        let (start, end) = budget.window(at(2024, 3, 20));
        assert_eq!(start, at(2024, 3, 15));
        assert_eq!(end, at(2024, 4, 15));

        // Before the 15th the window still starts in the previous month.
        let (start, end) = budget.window(at(2024, 3, 10));
        assert_eq!(start, at(2024, 2, 15));
        assert_eq!(end, at(2024, 3, 15));
    }

    #[test]
    fn weekly_window_steps_by_seven_days() {
        let mut budget = monthly_budget("Fuel", 200.0, at(2024, 1, 1));
        budget.period = BudgetPeriod::Weekly;
        let (start, end) = budget.window(at(2024, 1, 17));
        assert_eq!(start, at(2024, 1, 15));
        assert_eq!(end, at(2024, 1, 22));
    }

    #[test]
    fn progress_counts_only_matching_expenses_in_window() {
        let budget = monthly_budget("Food", 500.0, at(2024, 1, 1));
        let expenses = vec![
            expense("food", 200.0, at(2024, 3, 2)),
            expense("Food", 350.0, at(2024, 3, 28)),
            expense("Food", 999.0, at(2024, 2, 28)),
            expense("Transport", 50.0, at(2024, 3, 5)),
        ];
        let progress = budget_progress(&budget, &expenses, at(2024, 3, 30));
        assert_eq!(progress.spent, 550.0);
        assert_eq!(progress.remaining, -50.0);
        assert!(progress.exceeded);
        assert_eq!(progress.percent_used, 110.0);
    }

    #[test]
    fn contributions_complete_goals() {
        let now = at(2024, 5, 1);
        let mut goal = Goal::from_draft(
            Uuid::nil(),
            NewGoal {
                name: "Hajj".to_string(),
                target_amount: 1000.0,
                current_amount: Some(600.0),
                deadline: None,
            },
            now,
        );
        assert_eq!(goal.status, GoalStatus::Active);
        goal.contribute(300.0, now);
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.progress_percent(), 90.0);
        goal.contribute(100.0, now);
        assert_eq!(goal.status, GoalStatus::Completed);
    }

    #[test]
    fn cancelled_goals_stay_cancelled() {
        let now = at(2024, 5, 1);
        let mut goal = Goal::from_draft(
            Uuid::nil(),
            NewGoal {
                name: "Car".to_string(),
                target_amount: 100.0,
                current_amount: None,
                deadline: None,
            },
            now,
        );
        goal.apply_patch(
            GoalPatch {
                status: Some(GoalStatus::Cancelled),
                current_amount: Some(150.0),
                ..Default::default()
            },
            now,
        );
        assert_eq!(goal.status, GoalStatus::Cancelled);
    }

    #[test]
    fn categories_conflict_on_kind_and_name() {
        let now = at(2024, 1, 1);
        let draft = |name: &str, kind| NewCategory {
            name: name.to_string(),
            kind: Some(kind),
            color: None,
            icon: None,
        };
        let a = Category::from_draft(Uuid::nil(), draft("Groceries", CategoryKind::Expense), now);
        let b = Category::from_draft(Uuid::nil(), draft("groceries", CategoryKind::Expense), now);
        let c = Category::from_draft(Uuid::nil(), draft("Groceries", CategoryKind::Income), now);
        assert!(a.conflicts_with(&b));
        assert!(!a.conflicts_with(&c));
        assert!(!a.conflicts_with(&a));
    }

    #[test]
    fn overview_groups_categories() {
        let now = at(2024, 4, 1);
        let income = Income::from_draft(
            Uuid::nil(),
            NewIncome {
                amount: 5000.0,
                source: "Salary".to_string(),
                description: None,
                date: Some(now),
                recurring: true,
            },
            now,
        );
        let expenses = vec![
            expense("Rent", 2000.0, now),
            expense("food", 300.0, now),
            expense("Food", 200.0, now),
        ];
        let summary = overview(&[income], &expenses);
        assert_eq!(summary.total_income, 5000.0);
        assert_eq!(summary.total_expenses, 2500.0);
        assert_eq!(summary.net, 2500.0);
        assert_eq!(summary.expenses_by_category.len(), 2);
        assert_eq!(summary.expenses_by_category[0].category, "Rent");
        assert_eq!(summary.expenses_by_category[1].total, 500.0);
    }

    #[test]
    fn within_filters_by_date() {
        let entries = vec![
            expense("A", 1.0, at(2024, 1, 1)),
            expense("B", 1.0, at(2024, 2, 1)),
            expense("C", 1.0, at(2024, 3, 1)),
        ];
        let kept = within(entries, Some(at(2024, 1, 15)), Some(at(2024, 2, 15)));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].category, "B");
    }
}
