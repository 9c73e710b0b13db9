use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// Top-level shop section. Stored and exchanged as SCREAMING_SNAKE strings.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Section {
    HerramientasManuales,
    MaquinariaDeJardin,
    Riego,
    CultivoYHuerto,
    ProteccionYSeguridad,
    AccesoriosYRepuestos,
    JardinYExterior,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::HerramientasManuales,
        Section::MaquinariaDeJardin,
        Section::Riego,
        Section::CultivoYHuerto,
        Section::ProteccionYSeguridad,
        Section::AccesoriosYRepuestos,
        Section::JardinYExterior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::HerramientasManuales => "HERRAMIENTAS_MANUALES",
            Section::MaquinariaDeJardin => "MAQUINARIA_DE_JARDIN",
            Section::Riego => "RIEGO",
            Section::CultivoYHuerto => "CULTIVO_Y_HUERTO",
            Section::ProteccionYSeguridad => "PROTECCION_Y_SEGURIDAD",
            Section::AccesoriosYRepuestos => "ACCESORIOS_Y_REPUESTOS",
            Section::JardinYExterior => "JARDIN_Y_EXTERIOR",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TaxonomyError> {
        Section::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| TaxonomyError::UnknownSection(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Product category. Every category belongs to exactly one [`Section`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    CorteYPoda,
    LabranzaYPlantacion,
    RiegoManual,
    CortacespedesYDesbrozadoras,
    CortasetosYMotosierras,
    SopladoresYTrituradores,
    RiegoAutomatico,
    Mangueras,
    MacetasEInvernaderos,
    AbonosYSustratos,
    GuantesYRopaProteccion,
    GafasYCascos,
    CuchillasYCadenas,
    BateriasYCargadores,
    MueblesYDecoracion,
    IluminacionExterior,
}

impl Category {
    pub const ALL: [Category; 16] = [
        Category::CorteYPoda,
        Category::LabranzaYPlantacion,
        Category::RiegoManual,
        Category::CortacespedesYDesbrozadoras,
        Category::CortasetosYMotosierras,
        Category::SopladoresYTrituradores,
        Category::RiegoAutomatico,
        Category::Mangueras,
        Category::MacetasEInvernaderos,
        Category::AbonosYSustratos,
        Category::GuantesYRopaProteccion,
        Category::GafasYCascos,
        Category::CuchillasYCadenas,
        Category::BateriasYCargadores,
        Category::MueblesYDecoracion,
        Category::IluminacionExterior,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::CorteYPoda => "CORTE_Y_PODA",
            Category::LabranzaYPlantacion => "LABRANZA_Y_PLANTACION",
            Category::RiegoManual => "RIEGO_MANUAL",
            Category::CortacespedesYDesbrozadoras => "CORTACESPEDES_Y_DESBROZADORAS",
            Category::CortasetosYMotosierras => "CORTASETOS_Y_MOTOSIERRAS",
            Category::SopladoresYTrituradores => "SOPLADORES_Y_TRITURADORES",
            Category::RiegoAutomatico => "RIEGO_AUTOMATICO",
            Category::Mangueras => "MANGUERAS",
            Category::MacetasEInvernaderos => "MACETAS_E_INVERNADEROS",
            Category::AbonosYSustratos => "ABONOS_Y_SUSTRATOS",
            Category::GuantesYRopaProteccion => "GUANTES_Y_ROPA_PROTECCION",
            Category::GafasYCascos => "GAFAS_Y_CASCOS",
            Category::CuchillasYCadenas => "CUCHILLAS_Y_CADENAS",
            Category::BateriasYCargadores => "BATERIAS_Y_CARGADORES",
            Category::MueblesYDecoracion => "MUEBLES_Y_DECORACION",
            Category::IluminacionExterior => "ILUMINACION_EXTERIOR",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TaxonomyError> {
        Category::ALL
            .into_iter()
            .find(|v| v.as_str() == s.trim())
            .ok_or_else(|| TaxonomyError::UnknownCategory(s.to_string()))
    }

    /// Human title for listings: "CORTE_Y_PODA" -> "CORTE Y PODA".
    pub fn display_title(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

// ---------------------------------------------------------------------------
// Section -> Category map
// ---------------------------------------------------------------------------

/// Categories an admin may assign to a product in `section`.
pub fn categories_for(section: Section) -> &'static [Category] {
    use Category::*;
    match section {
        Section::HerramientasManuales => &[CorteYPoda, LabranzaYPlantacion, RiegoManual],
        Section::MaquinariaDeJardin => &[
            CortacespedesYDesbrozadoras,
            CortasetosYMotosierras,
            SopladoresYTrituradores,
        ],
        Section::Riego => &[RiegoAutomatico, Mangueras],
        Section::CultivoYHuerto => &[MacetasEInvernaderos, AbonosYSustratos],
        Section::ProteccionYSeguridad => &[GuantesYRopaProteccion, GafasYCascos],
        Section::AccesoriosYRepuestos => &[CuchillasYCadenas, BateriasYCargadores],
        Section::JardinYExterior => &[MueblesYDecoracion, IluminacionExterior],
    }
}

/// Owning section of a category.
pub fn section_of(category: Category) -> Section {
    Section::ALL
        .into_iter()
        .find(|s| categories_for(*s).contains(&category))
        // Every category is listed under exactly one section (see tests).
        .unwrap_or(Section::JardinYExterior)
}

// ---------------------------------------------------------------------------
// TaxonomyError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyError {
    UnknownSection(String),
    UnknownCategory(String),
}

impl std::fmt::Display for TaxonomyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxonomyError::UnknownSection(s) => write!(f, "unknown section: {s}"),
            TaxonomyError::UnknownCategory(s) => write!(f, "unknown category: {s}"),
        }
    }
}

impl std::error::Error for TaxonomyError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_belongs_to_exactly_one_section() {
        for c in Category::ALL {
            let owners: Vec<_> = Section::ALL
                .into_iter()
                .filter(|s| categories_for(*s).contains(&c))
                .collect();
            assert_eq!(owners.len(), 1, "{c:?} owners: {owners:?}");
            assert_eq!(section_of(c), owners[0]);
        }
    }

    #[test]
    fn parse_round_trips_wire_names() {
        for s in Section::ALL {
            assert_eq!(Section::parse(s.as_str()).unwrap(), s);
        }
        for c in Category::ALL {
            assert_eq!(Category::parse(c.as_str()).unwrap(), c);
        }
        assert!(Section::parse("JARDINERIA").is_err());
    }

    #[test]
    fn serde_uses_wire_names() {
        let v = serde_json::to_string(&Category::MacetasEInvernaderos).unwrap();
        assert_eq!(v, "\"MACETAS_E_INVERNADEROS\"");
        let s: Section = serde_json::from_str("\"MAQUINARIA_DE_JARDIN\"").unwrap();
        assert_eq!(s, Section::MaquinariaDeJardin);
    }
}
