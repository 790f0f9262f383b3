use crate::{
    frame::{tick_label, GridSpec},
    interval::StickForm,
    units::{ElevUnits, Length, VerticalScale},
    XsecError,
};

/// Schematic half-width of polygon sticks.
pub const DEFAULT_STICK_WIDTH: f64 = 25.0;

#[cfg(feature = "serde")]
fn default_stick_width() -> f64 {
    DEFAULT_STICK_WIDTH
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Project {
    pub elev_units: ElevUnits,
    pub vertical_exaggeration: f64,
    /// Boreholes farther than this from a traverse line are ignored.
    pub selection_distance: Length,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stick_form: StickForm,
    #[cfg_attr(feature = "serde", serde(default = "default_stick_width"))]
    pub stick_width: f64,
    pub grids: Vec<GridSpec>,
}

impl Project {
    pub fn new(elev_units: ElevUnits, vertical_exaggeration: f64, selection_distance: Length) -> Self {
        Self {
            elev_units,
            vertical_exaggeration,
            selection_distance,
            stick_form: StickForm::Line,
            stick_width: DEFAULT_STICK_WIDTH,
            grids: Vec::new(),
        }
    }

    #[must_use]
    pub fn grid(mut self, spec: GridSpec) -> Self {
        self.grids.push(spec);
        self
    }

    #[must_use]
    pub fn stick_form(mut self, form: StickForm, width: f64) -> Self {
        self.stick_form = form;
        self.stick_width = width;
        self
    }

    pub fn validate(&self) -> Result<(), XsecError> {
        let ve = self.vertical_exaggeration;
        if !(ve.is_finite() && ve > 0.0) {
            return Err(XsecError::Config(format!(
                "vertical exaggeration must be positive, got {ve}"
            )));
        }
        let selection = self.selection_distance.meters();
        if !(selection.is_finite() && selection > 0.0) {
            return Err(XsecError::Config(format!(
                "selection distance must be positive, got {}",
                self.selection_distance
            )));
        }
        if self.stick_form == StickForm::Polygon && (self.stick_width.is_nan() || self.stick_width <= 0.0) {
            return Err(XsecError::Config(format!(
                "stick width must be positive, got {}",
                self.stick_width
            )));
        }
        if self.grids.is_empty() {
            return Err(XsecError::Config("no grid spacing configured".into()));
        }
        self.grids.iter().try_for_each(GridSpec::validate)
    }

    pub fn scale(&self) -> VerticalScale {
        VerticalScale::new(self.elev_units, self.vertical_exaggeration)
    }

    /// Exaggeration as it appears in output names, e.g. `10`.
    pub fn ve_label(&self) -> String {
        tick_label(self.vertical_exaggeration)
    }
}
