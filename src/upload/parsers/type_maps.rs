//! Bank-specific transaction type label tables.
//!
//! Intesa: keyed on the lowercased `operazione` column (exact match first,
//! then longest-substring match). Allianz: keyed on the lowercased first
//! dash-separated token of the movement description.

pub const ALTRO: &str = "Altro";
pub const ADDEBITO_DIRETTO: &str = "Addebito diretto";
pub const ASSEGNO: &str = "Assegno";
pub const BANCOMAT_PAY: &str = "BANCOMAT Pay";
pub const BONIFICO_EFFETTUATO: &str = "Bonifico effettuato";
pub const BONIFICO_RICEVUTO: &str = "Bonifico ricevuto";
pub const CANONE_CC: &str = "Canone CC";
pub const CANONE_INVESTIMENTO: &str = "Canone investimento";
pub const CARTA_DI_CREDITO: &str = "Carta di credito";
pub const CARTA_PREPAGATA: &str = "Carta prepagata";
pub const COMMISSIONE: &str = "Commissione su bonifico/addebito diretto";
pub const GIROCONTO: &str = "Giroconto";
pub const IMPORTO_INIZIALE: &str = "Importo iniziale su conto";
pub const IMPOSTA_DI_BOLLO: &str = "Imposta di bollo";
pub const TASSE_INVESTIMENTI: &str = "Tasse investimenti";
pub const INVESTIMENTO: &str = "Investimento";
pub const PAGAMENTO_CON_CARTA: &str = "Pagamento con carta";
pub const PAGAMENTO_F24: &str = "Pagamento F24";
pub const PAGAMENTO_MAV: &str = "Pagamento Mav";
pub const PRELIEVO_CONTANTI: &str = "Prelievo contanti";
pub const PREMIO_POLIZZA: &str = "Premio polizza assicurativa";
pub const RICARICA_PREPAGATA: &str = "Ricarica Carta Prepagata";
pub const STIPENDIO: &str = "Stipendio";

pub const TRANSACTION_MAP_INTESA: &[(&str, &str)] = &[
    ("pagamento adue", ADDEBITO_DIRETTO),
    ("addebito diretto", ADDEBITO_DIRETTO),
    ("assegni", ASSEGNO),
    ("assegni circolari emessi", ASSEGNO),
    ("bancomat pay", BANCOMAT_PAY),
    ("fast pay", BANCOMAT_PAY),
    ("beu tramite internet banking", BONIFICO_EFFETTUATO),
    ("bonifico disposto a favore di", BONIFICO_EFFETTUATO),
    (
        "bonifico istantaneo da voi disposto a favore di",
        BONIFICO_EFFETTUATO,
    ),
    ("disposizione di bonifico", BONIFICO_EFFETTUATO),
    ("accredito beu con contabile", BONIFICO_RICEVUTO),
    ("accredito bonifico istantaneo", BONIFICO_RICEVUTO),
    ("bonifico disposto da", BONIFICO_RICEVUTO),
    ("bonifico istantaneo disposto da", BONIFICO_RICEVUTO),
    ("canone", CANONE_INVESTIMENTO),
    ("ritenute su titoli esteri", TASSE_INVESTIMENTI),
    ("commiss", COMMISSIONE),
    ("costo bonifico istantaneo", COMMISSIONE),
    ("maggiorazione bonifico istantaneo", COMMISSIONE),
    ("giroconto", GIROCONTO),
    ("saldo contabile iniziale", IMPORTO_INIZIALE),
    ("imposta di bollo", IMPOSTA_DI_BOLLO),
    ("investimento", INVESTIMENTO),
    ("pagamento premio assicurativo", INVESTIMENTO),
    // Matched against `dettagli`, not `operazione`; kept here with the rest.
    ("carta n.", PAGAMENTO_CON_CARTA),
    ("deleghe fisco", PAGAMENTO_F24),
    ("pagamento", PAGAMENTO_F24),
    ("pagamento delega f24", PAGAMENTO_F24),
    ("pagamento mav", PAGAMENTO_MAV),
    ("premio polizza", PREMIO_POLIZZA),
    ("ricarica carta prepagata", RICARICA_PREPAGATA),
    ("stipendio", STIPENDIO),
];

pub const TRANSACTION_MAP_ALLIANZ: &[(&str, &str)] = &[
    ("addeb. diretto", ADDEBITO_DIRETTO),
    ("pagam. diversi", ADDEBITO_DIRETTO),
    ("ass. circolare", ASSEGNO),
    ("disposizione", BONIFICO_EFFETTUATO),
    ("bonif. v/fav.", BONIFICO_RICEVUTO),
    ("st. add. generi", BONIFICO_RICEVUTO),
    ("addebito canone", CANONE_CC),
    ("addebito nexi", CARTA_DI_CREDITO),
    ("cartasi", CARTA_DI_CREDITO),
    ("imposta bollo", IMPOSTA_DI_BOLLO),
    ("imposte/tasse", TASSE_INVESTIMENTI),
    ("pagam. pos", PAGAMENTO_CON_CARTA),
    ("delega unica", PAGAMENTO_F24),
    ("bancomat", PRELIEVO_CONTANTI),
    ("emolumenti", STIPENDIO),
];

pub fn lookup(map: &[(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    map.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// Longest-key-first substring match, so more specific patterns win.
pub fn lookup_substring(
    map: &[(&'static str, &'static str)],
    haystack: &str,
) -> Option<&'static str> {
    let mut keys: Vec<&(&str, &str)> = map.iter().collect();
    keys.sort_by_key(|(k, _)| std::cmp::Reverse(k.len()));
    keys.iter()
        .find(|(k, _)| haystack.contains(k))
        .map(|(_, v)| *v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_lookup_hits_and_misses() {
        assert_eq!(lookup(TRANSACTION_MAP_INTESA, "giroconto"), Some(GIROCONTO));
        assert_eq!(lookup(TRANSACTION_MAP_INTESA, "nope"), None);
    }

    #[test]
    fn substring_lookup_prefers_longest_key() {
        // "pagamento delega f24" contains both "pagamento" and the longer
        // "pagamento delega f24"; the longer key must win.
        assert_eq!(
            lookup_substring(TRANSACTION_MAP_INTESA, "pagamento delega f24 n. 123"),
            Some(PAGAMENTO_F24)
        );
        assert_eq!(
            lookup_substring(TRANSACTION_MAP_INTESA, "costo bonifico istantaneo applicato"),
            Some(COMMISSIONE)
        );
    }
}
