//! Pure Running-Account bill arithmetic.

use rust_decimal::Decimal;
use uuid::Uuid;
use worksbill_domain::{BillSummary, BoqItem, BudgetLineItem, EtpInput, GstTreatment, RaBill};

use crate::{
    money::{percent_of, round2, HUNDRED},
    CoreError,
};

/// Computes bill summaries and validates bill-related amounts.
pub struct BillCalculator;

impl BillCalculator {
    /// Derives the deduction summary for `input`.
    ///
    /// Retention and GST are rounded once each. The net is rounded once from the
    /// gross less those amounts and the deductions exactly as entered;
    /// `total_deductions` is only for display.
    pub fn calculate_etp(
        input: &EtpInput,
        treatment: GstTreatment,
    ) -> Result<BillSummary, CoreError> {
        Self::validate(input)?;
        tracing::debug!(gross = %input.gross_amount, gst = %input.gst_percentage, retention = %input.retention_percentage, "calculating bill summary");

        let gross = input.gross_amount;
        let retention_amount = round2(percent_of(gross, input.retention_percentage));
        let gst_amount = round2(percent_of(gross, input.gst_percentage));
        let withheld_gst = match treatment {
            GstTreatment::Informational => Decimal::ZERO,
            GstTreatment::Withheld => gst_amount,
        };
        let deductions =
            retention_amount + input.other_deductions + input.advances_recovery + withheld_gst;
        let total_deductions = round2(deductions);
        let net_payable = round2(gross - deductions);

        Ok(BillSummary {
            gross_amount: gross,
            retention_amount,
            gst_amount,
            other_deductions: input.other_deductions,
            advances_recovery: input.advances_recovery,
            total_deductions,
            net_payable,
            gst_treatment: treatment,
            over_recovery: net_payable < Decimal::ZERO,
        })
    }

    pub fn validate(input: &EtpInput) -> Result<(), CoreError> {
        if input.gross_amount < Decimal::ZERO {
            return Err(CoreError::InvalidCalculationInput(
                "gross_amount must not be negative".into(),
            ));
        }
        check_percentage("gst_percentage", input.gst_percentage)?;
        check_percentage("retention_percentage", input.retention_percentage)?;
        for (field, amount) in [
            ("other_deductions", input.other_deductions),
            ("advances_recovery", input.advances_recovery),
        ] {
            if amount < Decimal::ZERO {
                return Err(CoreError::InvalidCalculationInput(format!(
                    "{field} must not be negative"
                )));
            }
            if amount > input.gross_amount {
                return Err(CoreError::InvalidCalculationInput(format!(
                    "{field} ({amount}) exceeds gross_amount ({})",
                    input.gross_amount
                )));
            }
        }
        Ok(())
    }

    /// Value of work verified since `previous` was raised, at contract rates.
    pub fn gross_from_ledger(
        rows: &[(BoqItem, Decimal)],
        previous: Option<&RaBill>,
    ) -> Decimal {
        let total: Decimal = rows
            .iter()
            .map(|(item, verified)| {
                let billed = previous
                    .map(|bill| bill.snapshot_quantity(item.id))
                    .unwrap_or(Decimal::ZERO);
                let fresh = (*verified - billed).max(Decimal::ZERO);
                fresh * item.rate
            })
            .sum();
        round2(total)
    }

    /// Remaining allocation on a fund head for a project after that project's other bills on it.
    pub fn allocation_headroom(
        fund_head_id: Uuid,
        project_id: Uuid,
        lines: &[BudgetLineItem],
        bills: &[RaBill],
        excluding_bill: Option<Uuid>,
    ) -> Decimal {
        let allocated: Decimal = lines
            .iter()
            .filter(|line| line.fund_head_id == fund_head_id && line.project_id == project_id)
            .map(|line| line.allocated_amount)
            .sum();
        let committed: Decimal = bills
            .iter()
            .filter(|bill| bill.project_id == project_id)
            .filter(|bill| bill.fund_head_id == Some(fund_head_id))
            .filter(|bill| Some(bill.id) != excluding_bill)
            .map(|bill| bill.summary.gross_amount)
            .sum();
        allocated - committed
    }

    /// Fails with `Validation` when `gross` does not fit in the remaining allocation.
    pub fn check_allocation(
        fund_head_id: Uuid,
        project_id: Uuid,
        gross: Decimal,
        lines: &[BudgetLineItem],
        bills: &[RaBill],
        excluding_bill: Option<Uuid>,
    ) -> Result<Decimal, CoreError> {
        let headroom =
            Self::allocation_headroom(fund_head_id, project_id, lines, bills, excluding_bill);
        if gross > headroom {
            return Err(CoreError::Validation(format!(
                "gross amount {gross} exceeds remaining allocation {headroom} on fund head {fund_head_id}"
            )));
        }
        Ok(headroom - gross)
    }
}

/// Convenience form taking the raw parameters with GST treated as informational.
pub fn calculate_etp(
    gross_amount: Decimal,
    gst_percentage: Decimal,
    retention_percentage: Decimal,
    other_deductions: Decimal,
    advances_recovery: Decimal,
) -> Result<BillSummary, CoreError> {
    BillCalculator::calculate_etp(
        &EtpInput::new(
            gross_amount,
            gst_percentage,
            retention_percentage,
            other_deductions,
            advances_recovery,
        ),
        GstTreatment::Informational,
    )
}

fn check_percentage(field: &str, value: Decimal) -> Result<(), CoreError> {
    if value < Decimal::ZERO || value > HUNDRED {
        return Err(CoreError::InvalidCalculationInput(format!(
            "{field} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}
