//! Business-entity ("empresa") record and its create/update payload.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::record::{FieldValue, Registro};
use crate::types::Timestamp;

/// A business entity as stored by the remote system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Empresa {
    pub id: String,
    pub nit: String,
    pub nombre: String,
    pub representante: String,
    pub cedula: String,
    pub telefono: String,
    pub direccion: String,
    pub requiere_osi: bool,
    pub paga_recargos: bool,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// `Some` marks logical deletion; the remote store never physically
    /// removes rows.
    #[serde(rename = "deletedAt", default)]
    pub deleted_at: Option<Timestamp>,
}

/// Payload for creating or updating an empresa. The `id` is always
/// assigned by the remote system, never the client.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct EmpresaInput {
    #[validate(length(min = 1, message = "el nombre es obligatorio"))]
    pub nombre: String,
    #[validate(length(min = 5, max = 20, message = "el nit debe tener entre 5 y 20 caracteres"))]
    pub nit: String,
    #[validate(length(min = 1, message = "el representante es obligatorio"))]
    pub representante: String,
    #[validate(length(min = 1, message = "la cedula es obligatoria"))]
    pub cedula: String,
    pub telefono: String,
    pub direccion: String,
    pub requiere_osi: bool,
    pub paga_recargos: bool,
}

impl Registro for Empresa {
    const COLLECTION: &'static str = "empresas";
    const ENTITY: &'static str = "empresa";
    const DEFAULT_SORT_KEY: &'static str = "nombre";

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> String {
        format!("{} {}", self.nombre, self.nit)
    }

    fn search_haystacks(&self) -> Vec<&str> {
        vec![&self.nombre, &self.nit]
    }

    fn sort_value(&self, key: &str) -> Option<FieldValue> {
        match key {
            "nombre" => Some(FieldValue::Text(self.nombre.clone())),
            "nit" => Some(FieldValue::Text(self.nit.clone())),
            "representante" => Some(FieldValue::Text(self.representante.clone())),
            "cedula" => Some(FieldValue::Text(self.cedula.clone())),
            "direccion" => Some(FieldValue::Text(self.direccion.clone())),
            "requiere_osi" => Some(FieldValue::Bool(self.requiere_osi)),
            "paga_recargos" => Some(FieldValue::Bool(self.paga_recargos)),
            "createdAt" => self.created_at.map(|t| FieldValue::Int(t.timestamp_millis())),
            "updatedAt" => self.updated_at.map(|t| FieldValue::Int(t.timestamp_millis())),
            _ => None,
        }
    }

    fn filter_value(&self, dimension: &str) -> Option<FieldValue> {
        match dimension {
            "requiere_osi" => Some(FieldValue::Bool(self.requiere_osi)),
            "paga_recargos" => Some(FieldValue::Bool(self.paga_recargos)),
            _ => None,
        }
    }

    fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }
}
