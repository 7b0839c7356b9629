use std::fmt;

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a carrier assignment, as reported by the backend.
///
/// The backend speaks Spanish on the wire; parsing is case-insensitive and
/// unrecognized values are carried through rather than rejected, so a newly
/// introduced server-side state degrades to "no transition offered" instead
/// of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentState {
    Pending,
    InTransit,
    PartiallyDelivered,
    Delivered,
    Unknown(String),
}

impl AssignmentState {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "pendiente" => AssignmentState::Pending,
            "en curso" => AssignmentState::InTransit,
            "parcialmente entregado" => AssignmentState::PartiallyDelivered,
            "entregado" | "completado" => AssignmentState::Delivered,
            _ => AssignmentState::Unknown(value.trim().to_string()),
        }
    }

    /// Wire representation expected by the backend.
    pub fn as_wire(&self) -> &str {
        match self {
            AssignmentState::Pending => "pendiente",
            AssignmentState::InTransit => "en curso",
            AssignmentState::PartiallyDelivered => "parcialmente entregado",
            AssignmentState::Delivered => "entregado",
            AssignmentState::Unknown(other) => other,
        }
    }

    /// Partially delivered assignments gate exactly like in-transit ones:
    /// the incidents checklist and both signature flows stay available and
    /// the same finalize call applies.
    pub fn is_in_transit(&self) -> bool {
        matches!(self, AssignmentState::InTransit | AssignmentState::PartiallyDelivered)
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, AssignmentState::Delivered)
    }

    /// Monotonic position in the lifecycle; `None` for unrecognized states.
    pub fn rank(&self) -> Option<u8> {
        match self {
            AssignmentState::Pending => Some(0),
            AssignmentState::InTransit | AssignmentState::PartiallyDelivered => Some(1),
            AssignmentState::Delivered => Some(2),
            AssignmentState::Unknown(_) => None,
        }
    }
}

impl Default for AssignmentState {
    fn default() -> Self {
        AssignmentState::Unknown(String::new())
    }
}

impl fmt::Display for AssignmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for AssignmentState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for AssignmentState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.map(|s| AssignmentState::parse(&s)).unwrap_or_default())
    }
}

/// One cargo line of an assignment (display only, never mutated locally).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CargoItem {
    /// Product variety
    #[serde(default, rename = "variedad")]
    pub variety: Option<String>,

    /// Weight in kilograms
    #[serde(default, rename = "peso")]
    pub weight: Option<f64>,

    /// Unit count
    #[serde(default, rename = "cantidad")]
    pub quantity: Option<u64>,
}

/// One carrier's responsibility for a portion of a shipment.
///
/// Created and owned by the backend; the core only reads it and requests
/// transitions on it. Every field the UI displays after a transition comes
/// from a fresh fetch, never from locally applied deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// Assignment identifier
    #[serde(rename = "id_asignacion")]
    pub id: u64,

    /// Parent shipment identifier
    #[serde(default, rename = "id_envio")]
    pub shipment_id: u64,

    /// Assignment lifecycle state
    #[serde(default, rename = "estado")]
    pub state: AssignmentState,

    /// Overall shipment state (display only)
    #[serde(default, rename = "estado_envio")]
    pub shipment_state: Option<String>,

    /// Origin location label
    #[serde(default, rename = "nombre_origen")]
    pub origin_name: Option<String>,

    /// Destination location label
    #[serde(default, rename = "nombre_destino")]
    pub destination_name: Option<String>,

    /// Origin coordinates as `[lat, lng]`
    #[serde(default, rename = "coordenadas_origen")]
    pub origin_coords: Option<[f64; 2]>,

    /// Destination coordinates as `[lat, lng]`
    #[serde(default, rename = "coordenadas_destino")]
    pub destination_coords: Option<[f64; 2]>,

    /// Transport kind label
    #[serde(default, rename = "tipo_transporte")]
    pub transport_kind: Option<String>,

    /// Cargo lines
    #[serde(default, rename = "cargas")]
    pub cargo: Vec<CargoItem>,

    /// Whether the backend already holds a customer signature. The backend
    /// sends anything from a boolean to the signature blob itself here, so
    /// this is read as a truthiness test rather than a strict bool.
    #[serde(default, rename = "firma_cliente", deserialize_with = "truthy_flag")]
    pub customer_signed: bool,

    /// Whether the backend already holds a carrier signature.
    #[serde(default, rename = "firma_transportista", deserialize_with = "truthy_flag")]
    pub carrier_signed: bool,
}

fn truthy_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Some(_) => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_parsing_is_case_insensitive() {
        assert_eq!(AssignmentState::parse("Pendiente"), AssignmentState::Pending);
        assert_eq!(AssignmentState::parse("EN CURSO"), AssignmentState::InTransit);
        assert_eq!(
            AssignmentState::parse("Parcialmente Entregado"),
            AssignmentState::PartiallyDelivered
        );
        assert_eq!(AssignmentState::parse("completado"), AssignmentState::Delivered);
    }

    #[test]
    fn test_unknown_state_is_carried_through() {
        let state = AssignmentState::parse("en revisión");
        assert_eq!(state, AssignmentState::Unknown("en revisión".to_string()));
        assert_eq!(state.rank(), None);
        assert!(!state.is_in_transit());
    }

    #[test]
    fn test_partially_delivered_gates_like_in_transit() {
        assert!(AssignmentState::PartiallyDelivered.is_in_transit());
        assert_eq!(
            AssignmentState::PartiallyDelivered.rank(),
            AssignmentState::InTransit.rank()
        );
    }

    #[test]
    fn test_rank_is_monotonic() {
        let pending = AssignmentState::Pending.rank().unwrap();
        let in_transit = AssignmentState::InTransit.rank().unwrap();
        let delivered = AssignmentState::Delivered.rank().unwrap();
        assert!(pending < in_transit && in_transit < delivered);
    }

    #[test]
    fn test_assignment_deserializes_from_backend_payload() {
        let payload = json!({
            "id_asignacion": 42,
            "id_envio": 7,
            "estado": "En curso",
            "estado_envio": "en curso",
            "nombre_origen": "Cochabamba",
            "nombre_destino": "Santa Cruz",
            "coordenadas_origen": [-17.39, -66.15],
            "coordenadas_destino": [-17.78, -63.18],
            "tipo_transporte": "refrigerado",
            "cargas": [{"variedad": "rosas", "peso": 120.5, "cantidad": 300}],
            "firma_cliente": false,
            "firma_transportista": "data:image/png;base64,iVBOR"
        });

        let assignment: Assignment = serde_json::from_value(payload).unwrap();
        assert_eq!(assignment.id, 42);
        assert_eq!(assignment.state, AssignmentState::InTransit);
        assert!(!assignment.customer_signed);
        // a non-empty signature blob counts as signed
        assert!(assignment.carrier_signed);
        assert_eq!(assignment.cargo[0].variety.as_deref(), Some("rosas"));
    }

    #[test]
    fn test_assignment_tolerates_missing_fields() {
        let assignment: Assignment = serde_json::from_value(json!({"id_asignacion": 9})).unwrap();
        assert_eq!(assignment.state, AssignmentState::default());
        assert!(!assignment.customer_signed);
        assert!(!assignment.carrier_signed);
        assert!(assignment.cargo.is_empty());
    }
}
