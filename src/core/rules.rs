use rust_decimal::Decimal;
use tracing::debug;

use super::amount::{classify_deviation, format_amount, tax_amount};
use super::check::{CheckId, CheckResult, Scope, Status};
use super::config::{Severity, ValidationConfig};
use super::types::*;

/// Run every structural and item-level arithmetic check on an invoice.
///
/// Order: header checks (when enabled), unreadable numeric tags, then each
/// item in document order. A missing or invalid field on one item never
/// prevents the other checks from running.
pub fn evaluate_rules(invoice: &Invoice, config: &ValidationConfig) -> Vec<CheckResult> {
    let mut results = Vec::new();

    if config.header_checks {
        check_header(invoice, config, &mut results);
    }

    for field in &invoice.invalid_fields {
        let scope = field.item.map_or(Scope::Document, Scope::Item);
        results.push(
            CheckResult::new(
                CheckId::NumericFormat,
                scope,
                Status::Fail,
                field.path.clone(),
                "Decimal number",
                format!("'{}' is not a decimal number", field.raw),
            )
            .with_found(field.raw.clone()),
        );
    }

    for item in &invoice.items {
        check_item(item, config, &mut results);
    }

    debug!(results = results.len(), "rule engine finished");
    results
}

fn check_header(invoice: &Invoice, config: &ValidationConfig, out: &mut Vec<CheckResult>) {
    let env = invoice.header.environment.as_deref().unwrap_or("");
    out.push(equals_check(
        CheckId::Environment,
        "ide/tpAmb",
        env,
        &config.expected_environment,
    ));

    out.push(filled_check(
        CheckId::IssuerCnpj,
        "emit/CNPJ",
        invoice.issuer.cnpj.as_deref(),
    ));
    out.push(filled_check(
        CheckId::IssuerIe,
        "emit/IE",
        invoice.issuer.state_registration.as_deref(),
    ));
    out.push(filled_check(
        CheckId::RecipientCnpj,
        "dest/CNPJ",
        invoice.recipient.cnpj.as_deref(),
    ));
    out.push(filled_check(
        CheckId::RecipientIe,
        "dest/IE",
        invoice.recipient.state_registration.as_deref(),
    ));
    out.push(filled_check(
        CheckId::RecipientUf,
        "dest/enderDest/UF",
        invoice.recipient.uf.as_deref(),
    ));

    let indicator = invoice.recipient.ie_indicator.as_deref().unwrap_or("");
    out.push(equals_check(
        CheckId::RecipientIeIndicator,
        "dest/indIEDest",
        indicator,
        &config.expected_recipient_indicator,
    ));
}

fn equals_check(check: CheckId, field: &str, found: &str, expected: &str) -> CheckResult {
    let status = if found == expected {
        Status::Pass
    } else {
        Status::Fail
    };
    let message = if status == Status::Pass {
        format!("{field} is {expected}")
    } else if found.is_empty() {
        format!("{field} is absent, expected {expected}")
    } else {
        format!("{field} is {found}, expected {expected}")
    };
    CheckResult::new(
        check,
        Scope::Document,
        status,
        field,
        format!("Must be {expected}"),
        message,
    )
    .with_found(found)
}

fn filled_check(check: CheckId, field: &str, value: Option<&str>) -> CheckResult {
    let value = value.map(str::trim).unwrap_or("");
    let (status, message) = if value.is_empty() {
        (Status::Fail, format!("{field} is not filled"))
    } else {
        (Status::Pass, format!("{field} is filled"))
    };
    CheckResult::new(check, Scope::Document, status, field, "Filled", message).with_found(value)
}

fn missing_status(config: &ValidationConfig) -> Status {
    match config.missing_tag_severity {
        Severity::Fail => Status::Fail,
        Severity::Warning => Status::Warning,
    }
}

fn check_item(item: &LineItem, config: &ValidationConfig, out: &mut Vec<CheckResult>) {
    let scope = Scope::Item(item.number);

    let Some(group) = &item.ibs_cbs else {
        out.push(CheckResult::new(
            CheckId::IbsCbsGroup,
            scope,
            missing_status(config),
            "imposto/IBSCBS",
            "IBSCBS group present",
            "IBSCBS group is absent",
        ));
        return;
    };

    out.push(code_presence(
        CheckId::IbsCbsCst,
        scope,
        "IBSCBS/CST",
        group.cst.as_deref(),
        config,
    ));
    out.push(code_presence(
        CheckId::IbsCbsClassTrib,
        scope,
        "IBSCBS/cClassTrib",
        group.class_code.as_deref(),
        config,
    ));

    let untaxed = group.cst.as_deref().is_some_and(|c| config.is_untaxed_cst(c));

    out.push(base_presence(scope, group.base, untaxed, config));
    out.push(amount_presence(
        CheckId::IbsValue,
        scope,
        "IBSCBS/gIBSCBS/vIBS",
        group.ibs_value,
        untaxed,
        config,
    ));
    out.push(amount_presence(
        CheckId::CbsValue,
        scope,
        "IBSCBS/gIBSCBS/gCBS/vCBS",
        group.cbs_value,
        untaxed,
        config,
    ));

    if untaxed {
        return;
    }

    if let (Some(base), Some(declared)) = (group.base, group.ibs_value) {
        out.push(arithmetic_check(
            CheckId::IbsArithmetic,
            scope,
            "IBSCBS/gIBSCBS/vIBS",
            base,
            config.ibs_rate,
            declared,
            config,
        ));
    }
    if let (Some(base), Some(declared)) = (group.base, group.cbs_value) {
        out.push(arithmetic_check(
            CheckId::CbsArithmetic,
            scope,
            "IBSCBS/gIBSCBS/gCBS/vCBS",
            base,
            config.cbs_rate,
            declared,
            config,
        ));
    }

    if let Some(result) = composition_check(scope, group, config) {
        out.push(result);
    }

    if let Some(declared) = group.ibs_rate() {
        out.push(declared_rate_check(
            CheckId::IbsDeclaredRate,
            scope,
            "IBSCBS/gIBSCBS/gIBSUF/pIBSUF + gIBSMun/pIBSMun",
            declared,
            config.ibs_rate,
        ));
    }
    if let Some(declared) = group.cbs_rate {
        out.push(declared_rate_check(
            CheckId::CbsDeclaredRate,
            scope,
            "IBSCBS/gIBSCBS/gCBS/pCBS",
            declared,
            config.cbs_rate,
        ));
    }
}

fn code_presence(
    check: CheckId,
    scope: Scope,
    field: &str,
    value: Option<&str>,
    config: &ValidationConfig,
) -> CheckResult {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => CheckResult::new(check, scope, Status::Pass, field, "Filled", format!("{field} = {v}"))
            .with_found(v),
        None => CheckResult::new(
            check,
            scope,
            missing_status(config),
            field,
            "Filled",
            format!("{field} is absent"),
        ),
    }
}

fn base_presence(
    scope: Scope,
    base: Option<Decimal>,
    untaxed: bool,
    config: &ValidationConfig,
) -> CheckResult {
    let field = "IBSCBS/gIBSCBS/vBC";
    let rule = "Filled (> 0 when taxed)";
    match base {
        _ if untaxed => CheckResult::new(
            CheckId::IbsCbsBase,
            scope,
            Status::Pass,
            field,
            rule,
            "not required for an untaxed CST",
        ),
        Some(b) if b > Decimal::ZERO => CheckResult::new(
            CheckId::IbsCbsBase,
            scope,
            Status::Pass,
            field,
            rule,
            format!("vBC = {}", format_amount(b)),
        )
        .with_found(format_amount(b)),
        Some(b) => CheckResult::new(
            CheckId::IbsCbsBase,
            scope,
            Status::Warning,
            field,
            rule,
            format!("vBC is {} on a taxed item", format_amount(b)),
        )
        .with_found(format_amount(b)),
        None => CheckResult::new(
            CheckId::IbsCbsBase,
            scope,
            missing_status(config),
            field,
            rule,
            "vBC is absent",
        ),
    }
}

fn amount_presence(
    check: CheckId,
    scope: Scope,
    field: &str,
    value: Option<Decimal>,
    untaxed: bool,
    config: &ValidationConfig,
) -> CheckResult {
    match value {
        _ if untaxed => CheckResult::new(
            check,
            scope,
            Status::Pass,
            field,
            "Filled",
            "not required for an untaxed CST",
        ),
        Some(v) => CheckResult::new(
            check,
            scope,
            Status::Pass,
            field,
            "Filled",
            format!("{field} = {}", format_amount(v)),
        )
        .with_found(format_amount(v)),
        None => CheckResult::new(
            check,
            scope,
            missing_status(config),
            field,
            "Filled",
            format!("{field} is absent"),
        ),
    }
}

fn arithmetic_check(
    check: CheckId,
    scope: Scope,
    field: &str,
    base: Decimal,
    rate: Decimal,
    declared: Decimal,
    config: &ValidationConfig,
) -> CheckResult {
    let rule = format!("vBC × {rate}% (2 places)");
    let Some(expected) = tax_amount(base, rate) else {
        return CheckResult::new(
            check,
            scope,
            Status::Fail,
            field,
            rule,
            format!("{} × {rate}% exceeds the decimal range", format_amount(base)),
        )
        .with_actual(declared);
    };
    let status = classify_deviation(expected, declared, config);
    let message = match status {
        Status::Pass => format!(
            "{} × {rate}% = {}",
            format_amount(base),
            format_amount(expected)
        ),
        _ => format!(
            "declared {}, expected {} ({} × {rate}%)",
            format_amount(declared),
            format_amount(expected),
            format_amount(base)
        ),
    };
    CheckResult::new(
        check,
        scope,
        status,
        field,
        rule,
        message,
    )
    .with_amounts(expected, declared)
}

fn composition_check(
    scope: Scope,
    group: &IbsCbs,
    config: &ValidationConfig,
) -> Option<CheckResult> {
    let declared = group.ibs_value?;
    if group.ibs_state_value.is_none() && group.ibs_municipal_value.is_none() {
        return None;
    }
    let Some(expected) = group
        .ibs_state_value
        .unwrap_or(Decimal::ZERO)
        .checked_add(group.ibs_municipal_value.unwrap_or(Decimal::ZERO))
    else {
        return Some(
            CheckResult::new(
                CheckId::IbsComposition,
                scope,
                Status::Fail,
                "IBSCBS/gIBSCBS/vIBS",
                "vIBSUF + vIBSMun",
                "vIBSUF + vIBSMun exceeds the decimal range",
            )
            .with_actual(declared),
        );
    };
    let status = classify_deviation(expected, declared, config);
    let message = match status {
        Status::Pass => "vIBS equals vIBSUF + vIBSMun".to_string(),
        _ => format!(
            "vIBS {} differs from vIBSUF + vIBSMun {}",
            format_amount(declared),
            format_amount(expected)
        ),
    };
    Some(
        CheckResult::new(
            CheckId::IbsComposition,
            scope,
            status,
            "IBSCBS/gIBSCBS/vIBS",
            "vIBSUF + vIBSMun",
            message,
        )
        .with_amounts(expected, declared),
    )
}

fn declared_rate_check(
    check: CheckId,
    scope: Scope,
    field: &str,
    declared: Decimal,
    configured: Decimal,
) -> CheckResult {
    let (status, message) = if declared == configured {
        (Status::Pass, format!("declared rate {declared}% matches"))
    } else {
        (
            Status::Warning,
            format!("declared rate {declared}% differs from phase rate {configured}%"),
        )
    };
    CheckResult::new(
        check,
        scope,
        status,
        field,
        format!("{configured}%"),
        message,
    )
    .with_amounts(configured, declared)
}
