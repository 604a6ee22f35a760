//! Business rules shared by the request handlers.
//!
//! Everything here is plain data in, plain data out. The database actor loads
//! the rows, runs the rule inside its transaction and writes the result back.

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::types::{OrderStatus, UserType};

pub const REGISTERED_MAX_WARNINGS: i32 = 3;
pub const VIP_MAX_WARNINGS: i32 = 2;
pub const VIP_SPEND_THRESHOLD_CENTS: i64 = 100_00;
pub const VIP_ORDER_THRESHOLD: i32 = 3;
pub const VIP_DISCOUNT_PERCENT: i64 = 5;
pub const ORDERS_PER_FREE_DELIVERY: i32 = 3;

pub const COMPLAINTS_BEFORE_DEMOTION: i32 = 3;
pub const COMPLIMENTS_FOR_BONUS: i32 = 3;
pub const DEMOTIONS_BEFORE_TERMINATION: i32 = 2;
pub const DEMOTION_SALARY_CUT_PERCENT: i64 = 10;

pub fn max_warnings(user_type: UserType) -> i32 {
    match user_type {
        UserType::Vip => VIP_MAX_WARNINGS,
        _ => REGISTERED_MAX_WARNINGS,
    }
}

/// Weight of a complaint or compliment: VIP voices count double.
pub fn feedback_weight(author_type: UserType) -> i32 {
    if author_type == UserType::Vip {
        2
    } else {
        1
    }
}

/// Customer-side numbers the rules operate on. Money in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerStanding {
    pub user_type: UserType,
    pub warnings_count: i32,
    pub deposit_balance: i64,
    pub total_spent: i64,
    pub order_count: i32,
    pub is_blacklisted: bool,
    pub vip_free_deliveries_remaining: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningOutcome {
    Warned { warnings: i32, max: i32 },
    /// Registered customer reached the limit; the deposit was cleared.
    Blacklisted { cleared_balance: i64 },
    /// VIP reached the limit and is a registered customer again.
    DemotedFromVip,
}

impl WarningOutcome {
    pub fn describe(&self) -> String {
        match self {
            WarningOutcome::Warned { warnings, max } => {
                format!("A warning was issued ({warnings}/{max})")
            }
            WarningOutcome::Blacklisted { .. } => {
                "Maximum warnings reached: the account has been closed".to_owned()
            }
            WarningOutcome::DemotedFromVip => {
                "Maximum warnings reached: VIP status has been revoked".to_owned()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub unit_price: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderQuote {
    pub subtotal: i64,
    pub discount: i64,
    pub delivery_fee: i64,
    pub total: i64,
    pub free_delivery: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub quote: OrderQuote,
    pub promoted_to_vip: bool,
    pub earned_free_delivery: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutDecision {
    Accepted(CheckoutReceipt),
    Rejected { shortfall: i64, outcome: WarningOutcome },
}

impl CustomerStanding {
    pub fn max_warnings(&self) -> i32 {
        max_warnings(self.user_type)
    }

    pub fn apply_warning(&mut self) -> WarningOutcome {
        self.warnings_count += 1;
        let max = self.max_warnings();

        if self.warnings_count < max {
            return WarningOutcome::Warned { warnings: self.warnings_count, max };
        }

        match self.user_type {
            UserType::Vip => {
                self.user_type = UserType::Registered;
                self.warnings_count = 0;
                self.vip_free_deliveries_remaining = 0;
                WarningOutcome::DemotedFromVip
            }
            _ => WarningOutcome::Blacklisted {
                cleared_balance: self.blacklist(),
            },
        }
    }

    /// Closes the customer out and returns the deposit that was cleared.
    pub fn blacklist(&mut self) -> i64 {
        let cleared_balance = self.deposit_balance;
        self.deposit_balance = 0;
        self.is_blacklisted = true;
        cleared_balance
    }

    /// Lifting a blacklist forgives the warnings that led to it.
    pub fn lift_blacklist(&mut self) {
        self.is_blacklisted = false;
        self.warnings_count = 0;
    }

    pub fn qualifies_for_vip(&self) -> bool {
        self.user_type == UserType::Registered
            && !self.is_blacklisted
            && self.warnings_count == 0
            && (self.total_spent >= VIP_SPEND_THRESHOLD_CENTS
                || self.order_count >= VIP_ORDER_THRESHOLD)
    }

    pub fn quote(&self, lines: &[CartLine], delivery_fee: i64) -> ServiceResult<OrderQuote> {
        if lines.is_empty() {
            return Err(ServiceError::bad_request("Cart is empty"));
        }
        if lines.iter().any(|line| line.quantity <= 0) {
            return Err(ServiceError::bad_request("Quantity must be at least 1"));
        }

        let subtotal: i64 = lines
            .iter()
            .map(|line| line.unit_price * i64::from(line.quantity))
            .sum();

        let discount = if self.user_type == UserType::Vip {
            (subtotal * VIP_DISCOUNT_PERCENT + 50) / 100
        } else {
            0
        };

        let free_delivery =
            self.user_type == UserType::Vip && self.vip_free_deliveries_remaining > 0;
        let delivery_fee = if free_delivery { 0 } else { delivery_fee };

        Ok(OrderQuote {
            subtotal,
            discount,
            delivery_fee,
            total: subtotal - discount + delivery_fee,
            free_delivery,
        })
    }

    /// Insufficient funds produce a warning that must be persisted even though
    /// the order itself is refused.
    pub fn checkout(&mut self, quote: OrderQuote) -> CheckoutDecision {
        if self.deposit_balance < quote.total {
            let shortfall = quote.total - self.deposit_balance;
            let outcome = self.apply_warning();
            return CheckoutDecision::Rejected { shortfall, outcome };
        }

        self.deposit_balance -= quote.total;
        self.total_spent += quote.total;
        self.order_count += 1;

        if quote.free_delivery {
            self.vip_free_deliveries_remaining -= 1;
        }

        let mut earned_free_delivery = false;
        if self.user_type == UserType::Vip && self.order_count % ORDERS_PER_FREE_DELIVERY == 0 {
            self.vip_free_deliveries_remaining += 1;
            earned_free_delivery = true;
        }

        let promoted_to_vip = self.qualifies_for_vip();
        if promoted_to_vip {
            self.user_type = UserType::Vip;
        }

        CheckoutDecision::Accepted(CheckoutReceipt {
            quote,
            promoted_to_vip,
            earned_free_delivery,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusActor {
    Chef,
    Delivery,
}

pub fn validate_transition(
    current: OrderStatus,
    next: OrderStatus,
    actor: StatusActor,
) -> ServiceResult<()> {
    let allowed = match actor {
        StatusActor::Chef => matches!(
            (current, next),
            (OrderStatus::Pending, OrderStatus::Preparing)
                | (OrderStatus::Preparing, OrderStatus::Ready)
        ),
        StatusActor::Delivery => matches!(
            (current, next),
            (OrderStatus::Ready, OrderStatus::Delivering)
                | (OrderStatus::Delivering, OrderStatus::Delivered)
        ),
    };

    if allowed {
        Ok(())
    } else {
        Err(ServiceError::bad_request(format!(
            "Cannot change order status from {current} to {next}"
        )))
    }
}

/// Disciplinary counters of a chef or delivery person. Salary in cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffRecord {
    pub salary: i64,
    pub complaint_count: i32,
    pub compliment_count: i32,
    pub demotion_count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplaintOutcome {
    pub demoted: bool,
    pub termination_eligible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplimentOutcome {
    pub complaints_cancelled: i32,
    pub bonus_eligible: bool,
}

impl StaffRecord {
    pub fn termination_eligible(&self) -> bool {
        self.demotion_count >= DEMOTIONS_BEFORE_TERMINATION
    }

    pub fn bonus_eligible(&self) -> bool {
        self.compliment_count >= COMPLIMENTS_FOR_BONUS
    }

    /// Outstanding compliments absorb complaints one for one before any count.
    pub fn apply_complaint(&mut self, weight: i32) -> ComplaintOutcome {
        let mut demoted = false;

        for _ in 0..weight.max(0) {
            if self.compliment_count > 0 {
                self.compliment_count -= 1;
                continue;
            }

            self.complaint_count += 1;
            if self.complaint_count >= COMPLAINTS_BEFORE_DEMOTION {
                self.demote();
                demoted = true;
            }
        }

        ComplaintOutcome {
            demoted,
            termination_eligible: self.termination_eligible(),
        }
    }

    pub fn apply_compliment(&mut self, weight: i32) -> ComplimentOutcome {
        let mut complaints_cancelled = 0;

        for _ in 0..weight.max(0) {
            if self.complaint_count > 0 {
                self.complaint_count -= 1;
                complaints_cancelled += 1;
            } else {
                self.compliment_count += 1;
            }
        }

        ComplimentOutcome {
            complaints_cancelled,
            bonus_eligible: self.bonus_eligible(),
        }
    }

    fn demote(&mut self) {
        self.demotion_count += 1;
        self.complaint_count = 0;
        self.salary -= (self.salary * DEMOTION_SALARY_CUT_PERCENT + 50) / 100;
    }

    pub fn award_bonus(&mut self, amount: i64) -> ServiceResult<()> {
        if amount <= 0 {
            return Err(ServiceError::bad_request("Bonus amount must be positive"));
        }
        self.salary += amount;
        self.compliment_count = 0;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryAction {
    Raise,
    Cut,
}

pub fn adjust_salary(
    current: i64,
    action: SalaryAction,
    amount: f64,
    is_percentage: bool,
) -> ServiceResult<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ServiceError::bad_request("Amount must be positive"));
    }

    let delta = if is_percentage {
        (current as f64 * amount / 100.0).round() as i64
    } else {
        crate::types::dollars_to_cents(amount)
    };

    let new_salary = match action {
        SalaryAction::Raise => current + delta,
        SalaryAction::Cut => current - delta,
    };

    if new_salary < 0 {
        return Err(ServiceError::bad_request("Salary cannot be negative"));
    }

    Ok(new_salary)
}

/// Picks a bid for a delivery. Returns whether the chosen bid is the lowest one.
/// Any other choice needs a written justification.
pub fn validate_bid_choice(
    chosen_amount: i64,
    all_amounts: &[i64],
    justification_memo: Option<&str>,
) -> ServiceResult<bool> {
    let lowest = all_amounts
        .iter()
        .copied()
        .min()
        .ok_or_else(|| ServiceError::bad_request("No bids have been placed for this order"))?;

    if chosen_amount <= lowest {
        return Ok(true);
    }

    match justification_memo.map(str::trim) {
        Some(memo) if !memo.is_empty() => Ok(false),
        _ => Err(ServiceError::bad_request(
            "A justification memo is required when not choosing the lowest bid",
        )),
    }
}

/// KB ratings go from 0 to 5; a zero flags the entry for the manager.
pub fn validate_kb_rating(rating: i32) -> ServiceResult<bool> {
    if !(0..=5).contains(&rating) {
        return Err(ServiceError::bad_request("Rating must be between 0 and 5"));
    }
    Ok(rating == 0)
}

pub fn validate_star_rating(rating: i32) -> ServiceResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ServiceError::bad_request("Rating must be between 1 and 5"));
    }
    Ok(())
}

pub fn validate_registration(username: &str, email: &str, password: &str) -> ServiceResult<()> {
    if username.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(ServiceError::bad_request("All fields are required"));
    }
    if username.trim().chars().count() < 3 {
        return Err(ServiceError::bad_request("Username must be at least 3 characters"));
    }
    if !is_valid_email(email.trim()) {
        return Err(ServiceError::bad_request("Please enter a valid email address"));
    }
    if password.chars().count() < 6 {
        return Err(ServiceError::bad_request("Password must be at least 6 characters"));
    }
    Ok(())
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !email.contains(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registered() -> CustomerStanding {
        CustomerStanding {
            user_type: UserType::Registered,
            warnings_count: 0,
            deposit_balance: 50_00,
            total_spent: 0,
            order_count: 0,
            is_blacklisted: false,
            vip_free_deliveries_remaining: 0,
        }
    }

    fn vip() -> CustomerStanding {
        CustomerStanding {
            user_type: UserType::Vip,
            ..registered()
        }
    }

    fn staff() -> StaffRecord {
        StaffRecord {
            salary: 3000_00,
            complaint_count: 0,
            compliment_count: 0,
            demotion_count: 0,
        }
    }

    #[test]
    fn manager_blacklist_clears_deposit_and_lifting_forgives_warnings() {
        let mut standing = CustomerStanding {
            warnings_count: 2,
            ..registered()
        };

        assert_eq!(standing.blacklist(), 50_00);
        assert_eq!(standing.deposit_balance, 0);
        assert!(standing.is_blacklisted);

        standing.lift_blacklist();
        assert!(!standing.is_blacklisted);
        assert_eq!(standing.warnings_count, 0);
        assert!(matches!(standing.apply_warning(), WarningOutcome::Warned { warnings: 1, .. }));
    }

    #[test]
    fn empty_cart_is_rejected() {
        let err = registered().quote(&[], 299).unwrap_err();
        assert_eq!(err.to_string(), "Cart is empty");
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let lines = [CartLine { unit_price: 500, quantity: 0 }];
        assert!(registered().quote(&lines, 299).is_err());
    }

    #[test]
    fn registered_customer_pays_full_price() {
        let lines = [
            CartLine { unit_price: 12_99, quantity: 2 },
            CartLine { unit_price: 4_50, quantity: 1 },
        ];
        let quote = registered().quote(&lines, 299).unwrap();

        assert_eq!(quote.subtotal, 30_48);
        assert_eq!(quote.discount, 0);
        assert_eq!(quote.delivery_fee, 299);
        assert_eq!(quote.total, 33_47);
        assert!(!quote.free_delivery);
    }

    #[test]
    fn vip_gets_five_percent_discount() {
        let lines = [CartLine { unit_price: 20_00, quantity: 1 }];
        let quote = vip().quote(&lines, 299).unwrap();

        assert_eq!(quote.discount, 1_00);
        assert_eq!(quote.total, 19_00 + 299);
    }

    #[test]
    fn vip_free_delivery_is_consumed() {
        let mut customer = CustomerStanding {
            vip_free_deliveries_remaining: 1,
            ..vip()
        };
        let quote = customer
            .quote(&[CartLine { unit_price: 10_00, quantity: 1 }], 299)
            .unwrap();
        assert!(quote.free_delivery);
        assert_eq!(quote.delivery_fee, 0);

        assert!(matches!(customer.checkout(quote), CheckoutDecision::Accepted(_)));
        assert_eq!(customer.vip_free_deliveries_remaining, 0);
    }

    #[test]
    fn every_third_vip_order_earns_free_delivery() {
        let mut customer = CustomerStanding {
            order_count: 2,
            deposit_balance: 100_00,
            ..vip()
        };
        let quote = customer
            .quote(&[CartLine { unit_price: 10_00, quantity: 1 }], 299)
            .unwrap();

        match customer.checkout(quote) {
            CheckoutDecision::Accepted(receipt) => assert!(receipt.earned_free_delivery),
            other => panic!("unexpected decision: {other:?}"),
        }
        assert_eq!(customer.vip_free_deliveries_remaining, 1);
    }

    #[test]
    fn insufficient_funds_issue_a_warning() {
        let mut customer = CustomerStanding {
            deposit_balance: 5_00,
            ..registered()
        };
        let quote = customer
            .quote(&[CartLine { unit_price: 10_00, quantity: 1 }], 0)
            .unwrap();

        match customer.checkout(quote) {
            CheckoutDecision::Rejected { shortfall, outcome } => {
                assert_eq!(shortfall, 5_00);
                assert_eq!(outcome, WarningOutcome::Warned { warnings: 1, max: 3 });
            }
            other => panic!("unexpected decision: {other:?}"),
        }
        assert_eq!(customer.deposit_balance, 5_00);
        assert_eq!(customer.order_count, 0);
    }

    #[test]
    fn third_warning_blacklists_registered_customer() {
        let mut customer = CustomerStanding {
            warnings_count: 2,
            deposit_balance: 7_25,
            ..registered()
        };

        let outcome = customer.apply_warning();

        assert_eq!(outcome, WarningOutcome::Blacklisted { cleared_balance: 7_25 });
        assert!(customer.is_blacklisted);
        assert_eq!(customer.deposit_balance, 0);
    }

    #[test]
    fn second_warning_demotes_vip() {
        let mut customer = CustomerStanding {
            warnings_count: 1,
            vip_free_deliveries_remaining: 2,
            ..vip()
        };

        let outcome = customer.apply_warning();

        assert_eq!(outcome, WarningOutcome::DemotedFromVip);
        assert_eq!(customer.user_type, UserType::Registered);
        assert_eq!(customer.warnings_count, 0);
        assert_eq!(customer.vip_free_deliveries_remaining, 0);
        assert!(!customer.is_blacklisted);
    }

    #[test]
    fn spending_one_hundred_dollars_promotes_to_vip() {
        let mut customer = CustomerStanding {
            deposit_balance: 200_00,
            total_spent: 90_00,
            order_count: 1,
            ..registered()
        };
        let quote = customer
            .quote(&[CartLine { unit_price: 10_00, quantity: 1 }], 0)
            .unwrap();

        match customer.checkout(quote) {
            CheckoutDecision::Accepted(receipt) => assert!(receipt.promoted_to_vip),
            other => panic!("unexpected decision: {other:?}"),
        }
        assert_eq!(customer.user_type, UserType::Vip);
        assert_eq!(customer.total_spent, 100_00);
    }

    #[test]
    fn third_order_promotes_to_vip() {
        let customer = CustomerStanding {
            order_count: 3,
            total_spent: 15_00,
            ..registered()
        };
        assert!(customer.qualifies_for_vip());
    }

    #[test]
    fn warnings_block_vip_promotion() {
        let customer = CustomerStanding {
            order_count: 5,
            warnings_count: 1,
            ..registered()
        };
        assert!(!customer.qualifies_for_vip());
    }

    #[test]
    fn chef_and_courier_own_different_transitions() {
        assert!(validate_transition(OrderStatus::Pending, OrderStatus::Preparing, StatusActor::Chef).is_ok());
        assert!(validate_transition(OrderStatus::Preparing, OrderStatus::Ready, StatusActor::Chef).is_ok());
        assert!(validate_transition(OrderStatus::Ready, OrderStatus::Delivering, StatusActor::Chef).is_err());

        assert!(validate_transition(OrderStatus::Ready, OrderStatus::Delivering, StatusActor::Delivery).is_ok());
        assert!(validate_transition(OrderStatus::Delivering, OrderStatus::Delivered, StatusActor::Delivery).is_ok());
        assert!(validate_transition(OrderStatus::Pending, OrderStatus::Delivered, StatusActor::Delivery).is_err());
        assert!(validate_transition(OrderStatus::Delivered, OrderStatus::Pending, StatusActor::Chef).is_err());
    }

    #[test]
    fn three_complaints_demote_and_cut_salary() {
        let mut record = staff();

        assert!(!record.apply_complaint(1).demoted);
        assert!(!record.apply_complaint(1).demoted);
        let outcome = record.apply_complaint(1);

        assert!(outcome.demoted);
        assert!(!outcome.termination_eligible);
        assert_eq!(record.demotion_count, 1);
        assert_eq!(record.complaint_count, 0);
        assert_eq!(record.salary, 2700_00);
    }

    #[test]
    fn vip_complaints_count_double() {
        let mut record = StaffRecord {
            complaint_count: 1,
            demotion_count: 1,
            ..staff()
        };

        let outcome = record.apply_complaint(feedback_weight(UserType::Vip));

        assert!(outcome.demoted);
        assert!(outcome.termination_eligible);
        assert_eq!(record.demotion_count, 2);
    }

    #[test]
    fn compliments_cancel_complaints() {
        let mut record = StaffRecord {
            complaint_count: 2,
            ..staff()
        };

        let outcome = record.apply_compliment(1);
        assert_eq!(outcome.complaints_cancelled, 1);
        assert_eq!(record.complaint_count, 1);
        assert_eq!(record.compliment_count, 0);

        record.apply_compliment(2);
        assert_eq!(record.complaint_count, 0);
        assert_eq!(record.compliment_count, 1);
    }

    #[test]
    fn banked_compliment_absorbs_complaint() {
        let mut record = StaffRecord {
            compliment_count: 1,
            ..staff()
        };
        record.apply_complaint(1);
        assert_eq!(record.compliment_count, 0);
        assert_eq!(record.complaint_count, 0);
    }

    #[test]
    fn three_compliments_make_bonus_eligible() {
        let mut record = staff();
        record.apply_compliment(1);
        record.apply_compliment(1);
        assert!(record.apply_compliment(1).bonus_eligible);

        record.award_bonus(100_00).unwrap();
        assert_eq!(record.salary, 3100_00);
        assert_eq!(record.compliment_count, 0);
        assert!(record.award_bonus(0).is_err());
    }

    #[test]
    fn salary_adjustments() {
        assert_eq!(adjust_salary(1000_00, SalaryAction::Raise, 10.0, true).unwrap(), 1100_00);
        assert_eq!(adjust_salary(1000_00, SalaryAction::Cut, 250.5, false).unwrap(), 749_50);
        assert!(adjust_salary(100_00, SalaryAction::Cut, 200.0, false).is_err());
        assert!(adjust_salary(100_00, SalaryAction::Raise, -5.0, false).is_err());
    }

    #[test]
    fn lowest_bid_needs_no_memo() {
        assert!(validate_bid_choice(5_00, &[7_00, 5_00, 6_00], None).unwrap());
    }

    #[test]
    fn higher_bid_needs_justification() {
        let bids = [7_00, 5_00];
        assert!(validate_bid_choice(7_00, &bids, None).is_err());
        assert!(validate_bid_choice(7_00, &bids, Some("   ")).is_err());
        assert!(!validate_bid_choice(7_00, &bids, Some("Closer to the customer")).unwrap());
        assert!(validate_bid_choice(7_00, &[], None).is_err());
    }

    #[test]
    fn kb_zero_rating_flags() {
        assert!(validate_kb_rating(0).unwrap());
        assert!(!validate_kb_rating(4).unwrap());
        assert!(validate_kb_rating(6).is_err());
        assert!(validate_star_rating(0).is_err());
    }

    #[test]
    fn registration_validation() {
        assert!(validate_registration("amina", "amina@example.com", "secret1").is_ok());
        assert_eq!(
            validate_registration("ab", "ab@example.com", "secret1").unwrap_err().to_string(),
            "Username must be at least 3 characters"
        );
        assert!(validate_registration("amina", "amina.example.com", "secret1").is_err());
        assert!(validate_registration("amina", "amina@example", "secret1").is_err());
        assert!(validate_registration("amina", "amina@example.com", "123").is_err());
        assert!(validate_registration("", "", "").is_err());
    }
}
