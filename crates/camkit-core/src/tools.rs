//! Tool definitions and the machine tool table
//!
//! Only the geometry the simulation needs is kept here: the cutter shape,
//! its diameter and lengths. Tool ids are the numbers used by `T` words; id 0
//! always means "empty spindle".

use crate::error::{ControllerError, Result};
use crate::state::MachineType;
use crate::units::Length;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tool types for classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolType {
    /// Flat end mill
    EndMillFlat,
    /// Ball end mill / ball nose
    EndMillBall,
    /// V-bit with an included tip angle in degrees
    VBit { tip_angle: f64 },
    /// Twist drill, modelled as a flat cylinder
    DrillBit,
    /// Lathe turning insert
    TurningInsert,
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndMillFlat => write!(f, "Flat End Mill"),
            Self::EndMillBall => write!(f, "Ball End Mill"),
            Self::VBit { tip_angle } => write!(f, "{}° V-Bit", tip_angle),
            Self::DrillBit => write!(f, "Drill Bit"),
            Self::TurningInsert => write!(f, "Turning Insert"),
        }
    }
}

/// Tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Display name
    pub name: String,
    /// Which kind of machine the tool is for
    pub class: MachineType,
    pub tool_type: ToolType,
    /// Cutting diameter
    pub diameter: Length,
    /// Length of the cutting portion
    pub flute_length: Length,
    /// Overall stick-out
    pub length: Length,
    pub flutes: u32,
}

impl Tool {
    /// Create a milling tool with basic properties
    pub fn new(name: impl Into<String>, tool_type: ToolType, diameter: Length, length: Length) -> Self {
        Self {
            name: name.into(),
            class: MachineType::Mill,
            tool_type,
            diameter,
            flute_length: length,
            length,
            flutes: 2,
        }
    }

    /// Get a descriptive string for the tool
    pub fn description_short(&self) -> String {
        format!(
            "{} - {} dia x {} length, {} flutes",
            self.name,
            self.diameter.as_mm(),
            self.length.as_mm(),
            self.flutes
        )
    }
}

/// Tools loaded into the machine, keyed by tool number
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolTable {
    tools: BTreeMap<u32, Tool>,
}

impl ToolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool already at `id`
    pub fn add_tool(&mut self, id: u32, tool: Tool) -> Result<Option<Tool>> {
        if id == 0 {
            return Err(ControllerError::ReservedToolId.into());
        }
        Ok(self.tools.insert(id, tool))
    }

    pub fn get_tool(&self, id: u32) -> Option<&Tool> {
        self.tools.get(&id)
    }

    pub fn remove_tool(&mut self, id: u32) -> Option<Tool> {
        self.tools.remove(&id)
    }

    /// True for registered ids and for 0
    pub fn is_valid_id(&self, id: u32) -> bool {
        id == 0 || self.tools.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Tool)> {
        self.tools.iter().map(|(id, t)| (*id, t))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Initialize a table with a few common milling tools
pub fn init_standard_table() -> ToolTable {
    let mut table = ToolTable::new();
    let mut add = |id: u32, tool: Tool| {
        table.tools.insert(id, tool);
    };

    let mut tool1 = Tool::new(
        "1/4\" Flat End Mill",
        ToolType::EndMillFlat,
        Length::mm(6.35),
        Length::mm(50.0),
    );
    tool1.flute_length = Length::mm(40.0);
    add(1, tool1);

    let mut tool2 = Tool::new(
        "1/8\" Ball End Mill",
        ToolType::EndMillBall,
        Length::mm(3.175),
        Length::mm(45.0),
    );
    tool2.flute_length = Length::mm(35.0);
    add(2, tool2);

    let mut tool3 = Tool::new(
        "90° V-Bit",
        ToolType::VBit { tip_angle: 90.0 },
        Length::mm(6.0),
        Length::mm(50.0),
    );
    tool3.flutes = 1;
    tool3.flute_length = Length::mm(10.0);
    add(3, tool3);

    table
}

/// Initialize a table with a general-purpose turning insert
pub fn init_lathe_table() -> ToolTable {
    let mut table = ToolTable::new();
    let mut insert = Tool::new(
        "80° CNMG Turning Insert",
        ToolType::TurningInsert,
        Length::mm(0.8),
        Length::mm(12.0),
    );
    insert.class = MachineType::Lathe;
    insert.flutes = 1;
    table.tools.insert(1, insert);
    table
}

/// Standard table for a machine type
pub fn standard_table_for(machine_type: MachineType) -> ToolTable {
    match machine_type {
        MachineType::Mill => init_standard_table(),
        MachineType::Lathe => init_lathe_table(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_reserved_id_rejected() {
        let mut table = ToolTable::new();
        let tool = Tool::new("t", ToolType::EndMillFlat, Length::mm(3.0), Length::mm(20.0));
        assert!(matches!(
            table.add_tool(0, tool),
            Err(Error::Controller(ControllerError::ReservedToolId))
        ));
    }

    #[test]
    fn test_zero_is_always_valid() {
        let table = ToolTable::new();
        assert!(table.is_valid_id(0));
        assert!(!table.is_valid_id(1));
    }

    #[test]
    fn test_standard_table() {
        let table = init_standard_table();
        assert_eq!(table.len(), 3);
        let vbit = table.get_tool(3).unwrap();
        assert_eq!(vbit.tool_type, ToolType::VBit { tip_angle: 90.0 });
        assert!(vbit.description_short().contains("1 flutes"));
    }

    #[test]
    fn test_lathe_table_holds_lathe_tools() {
        let table = standard_table_for(MachineType::Lathe);
        assert_eq!(table.len(), 1);
        assert!(table.iter().all(|(_, t)| t.class == MachineType::Lathe));
        assert!(standard_table_for(MachineType::Mill)
            .iter()
            .all(|(_, t)| t.class == MachineType::Mill));
    }

    #[test]
    fn test_replace_returns_previous() {
        let mut table = ToolTable::new();
        let a = Tool::new("a", ToolType::EndMillFlat, Length::mm(3.0), Length::mm(20.0));
        let b = Tool::new("b", ToolType::DrillBit, Length::mm(5.0), Length::mm(30.0));
        assert!(table.add_tool(4, a.clone()).unwrap().is_none());
        assert_eq!(table.add_tool(4, b).unwrap(), Some(a));
    }
}
