//! Canonical PGC-style chart seeded into new company books.

use crate::domain::account::AccountType::{Asset, Equity, Expense, Income, Liability};
use crate::domain::account::{Account, AccountType};

struct SeedAccount {
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    parent: Option<&'static str>,
}

const fn seed(
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    parent: Option<&'static str>,
) -> SeedAccount {
    SeedAccount {
        code,
        name,
        account_type,
        parent,
    }
}

// Parents must precede their children.
const STANDARD_CHART: &[SeedAccount] = &[
    seed("100", "Capital social", Equity, None),
    seed("129", "Resultado del ejercicio", Equity, None),
    seed("170", "Deudas a largo plazo con entidades de crédito", Liability, None),
    seed("217", "Equipos para procesos de información", Asset, None),
    seed("281", "Amortización acumulada del inmovilizado material", Asset, None),
    seed("300", "Mercaderías", Asset, None),
    seed("400", "Proveedores", Liability, None),
    seed("410", "Acreedores por prestaciones de servicios", Liability, None),
    seed("430", "Clientes", Asset, None),
    seed("472", "Hacienda Pública, IVA soportado", Asset, None),
    seed("473", "Hacienda Pública, retenciones y pagos a cuenta", Asset, None),
    seed("475", "Hacienda Pública, acreedora por conceptos fiscales", Liability, None),
    seed("4750", "Hacienda Pública, acreedora por IVA", Liability, Some("475")),
    seed("4751", "Hacienda Pública, acreedora por retenciones practicadas", Liability, Some("475")),
    seed("476", "Organismos de la Seguridad Social, acreedores", Liability, None),
    seed("477", "Hacienda Pública, IVA repercutido", Liability, None),
    seed("520", "Deudas a corto plazo con entidades de crédito", Liability, None),
    seed("570", "Caja", Asset, None),
    seed("572", "Bancos e instituciones de crédito", Asset, None),
    seed("600", "Compras de mercaderías", Expense, None),
    seed("621", "Arrendamientos y cánones", Expense, None),
    seed("622", "Reparaciones y conservación", Expense, None),
    seed("623", "Servicios de profesionales independientes", Expense, None),
    seed("624", "Transportes", Expense, None),
    seed("625", "Primas de seguros", Expense, None),
    seed("626", "Servicios bancarios y similares", Expense, None),
    seed("627", "Publicidad, propaganda y relaciones públicas", Expense, None),
    seed("628", "Suministros", Expense, None),
    seed("629", "Otros servicios", Expense, None),
    seed("631", "Otros tributos", Expense, None),
    seed("640", "Sueldos y salarios", Expense, None),
    seed("642", "Seguridad Social a cargo de la empresa", Expense, None),
    seed("662", "Intereses de deudas", Expense, None),
    seed("681", "Amortización del inmovilizado material", Expense, None),
    seed("700", "Ventas de mercaderías", Income, None),
    seed("705", "Prestaciones de servicios", Income, None),
    seed("759", "Ingresos por servicios diversos", Income, None),
    seed("769", "Otros ingresos financieros", Income, None),
];

/// Keyword → account code table used to route categorized expenses.
const EXPENSE_CATEGORIES: &[(&[&str], &str)] = &[
    (&["alquiler", "arrendamiento", "rent", "leasing"], "621"),
    (&["reparacion", "reparación", "mantenimiento", "repair", "maintenance"], "622"),
    (&["profesional", "asesoria", "asesoría", "gestoria", "gestoría", "legal", "consulting"], "623"),
    (&["transporte", "envio", "envío", "mensajeria", "mensajería", "shipping", "travel", "viaje"], "624"),
    (&["seguro", "insurance"], "625"),
    (&["banco", "bancario", "comision", "comisión", "bank", "fees"], "626"),
    (&["publicidad", "marketing", "advertising"], "627"),
    (&["suministro", "luz", "agua", "gas", "internet", "telefono", "teléfono", "utilities", "software"], "628"),
    (&["compra", "mercaderia", "mercadería", "material", "purchase"], "600"),
    (&["tributo", "impuesto", "tasa", "tax"], "631"),
];

/// Builds the standard chart as system accounts with parents linked by id.
pub fn standard_accounts() -> Vec<Account> {
    let mut accounts: Vec<Account> = Vec::with_capacity(STANDARD_CHART.len());
    for item in STANDARD_CHART {
        let group = group_of(item.code).unwrap_or(0);
        let mut account = Account::new(item.code, item.name, item.account_type, group);
        account.is_system = true;
        if let Some(parent_code) = item.parent {
            if let Some(parent) = accounts.iter().find(|a| a.code == parent_code) {
                account.parent_id = Some(parent.id);
                account.level = parent.level + 1;
            }
        }
        accounts.push(account);
    }
    accounts
}

/// PGC group (first digit of the code).
pub fn group_of(code: &str) -> Option<u8> {
    code.chars()
        .next()
        .and_then(|ch| ch.to_digit(10))
        .map(|digit| digit as u8)
        .filter(|group| (1..=7).contains(group))
}

/// Account code matching an expense category, if a keyword applies.
pub fn expense_code_for_category(category: &str) -> Option<&'static str> {
    let normalized = category.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }
    let words: Vec<&str> = normalized
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    EXPENSE_CATEGORIES
        .iter()
        .find(|(keywords, _)| {
            keywords
                .iter()
                .any(|kw| words.iter().any(|word| matches_keyword(word, kw)))
        })
        .map(|(_, code)| *code)
}

// Exact word or its plural.
fn matches_keyword(word: &str, keyword: &str) -> bool {
    match word.strip_prefix(keyword) {
        Some(rest) => rest.is_empty() || rest == "s" || rest == "es",
        None => false,
    }
}
