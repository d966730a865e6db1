//! Recommendation table
//!
//! User-facing advice assembled from the risk level plus the specific
//! signals present, capped at five entries. Text is Spanish, matching the
//! mobile client's audience.

use crate::logic::heuristics::weights;
use crate::logic::signal::{RiskLevel, Signal};

const MAX_RECOMMENDATIONS: usize = 5;

pub fn recommendations(level: RiskLevel, signals: &[Signal]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    match level {
        RiskLevel::High => {
            out.push("NO ingrese informacion personal o credenciales en este sitio".into());
            out.push("Esta URL presenta multiples indicadores de phishing".into());
            out.push("Verifique la URL oficial del servicio que busca".into());
            out.push("Reporte esta URL si la recibio por SMS o WhatsApp".into());
        }
        RiskLevel::Medium => {
            out.push("Proceda con precaucion".into());
            out.push("Verifique la autenticidad del sitio antes de ingresar datos".into());
            out.push("Considere contactar al servicio por sus canales oficiales".into());
        }
        RiskLevel::Low => {
            out.push("La URL parece segura, pero siempre verifique".into());
            out.push("Asegurese de que el sitio use HTTPS antes de ingresar datos sensibles".into());
        }
        RiskLevel::Safe => {
            out.push("Esta URL es segura".into());
            out.push("No se detectaron indicadores de phishing".into());
        }
    }

    for signal in signals {
        let advice: Option<&str> = match signal.id.as_str() {
            id if id == weights::URL_SHORTENER => {
                Some("Considere expandir la URL corta antes de visitarla")
            }
            id if id == weights::BRAND_IMPERSONATION => {
                Some("Este sitio parece suplantar una marca. Verifique la URL oficial")
            }
            id if id == weights::PASTE_SERVICE => Some(
                "Los servicios de paste se usan para distribuir malware. Verifique el origen del enlace",
            ),
            id if id == weights::NO_HTTPS => {
                Some("No ingrese contraseñas en sitios sin HTTPS")
            }
            id if id == weights::DOMAIN_NOT_IN_TRANCO => Some(
                "Este dominio no esta en la lista de sitios legitimos conocidos. Proceda con extrema precaucion",
            ),
            id if id == weights::DOMAIN_TOO_NEW => Some(
                "El dominio fue registrado hace muy poco. Los sitios de phishing usan dominios desechables",
            ),
            id if id.starts_with("VIRUSTOTAL_MALICIOUS") => {
                Some("ALERTA: VirusTotal detecta esta URL como maliciosa. No visite este sitio")
            }
            id if id == weights::VIRUSTOTAL_CLEAN => Some(
                "VirusTotal confirma que esta URL es segura segun multiples motores antivirus",
            ),
            id if id == weights::FORM_SUBMITS_EXTERNALLY => Some(
                "El formulario envia sus datos a otro dominio. No complete ningun campo",
            ),
            _ => None,
        };
        if let Some(advice) = advice {
            if !out.iter().any(|r| r == advice) {
                out.push(advice.to_string());
            }
        }
    }

    out.truncate(MAX_RECOMMENDATIONS);
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::signal::Severity;
    use serde_json::json;

    fn signal(id: &'static str) -> Signal {
        Signal::new(id, Severity::Medium, 10, json!({}), "")
    }

    #[test]
    fn test_high_level_leads_with_warning() {
        let recs = recommendations(RiskLevel::High, &[]);
        assert!(recs[0].contains("NO ingrese"));
    }

    #[test]
    fn test_signal_specific_advice_appended() {
        let recs = recommendations(RiskLevel::Low, &[signal(weights::URL_SHORTENER)]);
        assert!(recs.iter().any(|r| r.contains("expandir la URL corta")));
    }

    #[test]
    fn test_capped_at_five() {
        let signals = vec![
            signal(weights::URL_SHORTENER),
            signal(weights::BRAND_IMPERSONATION),
            signal(weights::PASTE_SERVICE),
            signal(weights::DOMAIN_NOT_IN_TRANCO),
        ];
        let recs = recommendations(RiskLevel::High, &signals);
        assert_eq!(recs.len(), 5);
    }

    #[test]
    fn test_safe_level() {
        let recs = recommendations(RiskLevel::Safe, &[]);
        assert!(recs.iter().any(|r| r.contains("segura")));
    }
}
