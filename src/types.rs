use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::visibility::VisibilityPredicate;

/// Platform an entity is surfaced as. Read-only elements are always
/// `Sensor`, whatever their source tag was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntityType {
    Number,
    Switch,
    Select,
    Button,
    Sensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataType {
    Real,
    Bool,
    Enum,
    Action,
    String,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceClass {
    Temperature,
    Power,
    Energy,
    Pressure,
    Voltage,
    Current,
    Frequency,
    Duration,
}

impl DeviceClass {
    pub fn from_unit(unit: &str) -> Option<Self> {
        match unit {
            "\u{00b0}C" | "K" | "\u{00b0}F" => Some(DeviceClass::Temperature),
            "W" | "kW" | "MW" => Some(DeviceClass::Power),
            "Wh" | "kWh" | "MWh" | "J" | "kJ" => Some(DeviceClass::Energy),
            "Pa" | "kPa" | "MPa" | "bar" | "mbar" | "psi" => Some(DeviceClass::Pressure),
            "V" | "mV" | "kV" => Some(DeviceClass::Voltage),
            "A" | "mA" => Some(DeviceClass::Current),
            "Hz" | "kHz" | "MHz" => Some(DeviceClass::Frequency),
            "s" | "min" | "h" => Some(DeviceClass::Duration),
            _ => None,
        }
    }
}

/// One option of an enumerated `choice` element, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label_cz: String,
    pub label_en: String,
}

/// Parsed schema for one controller property, built from a descriptor
/// document. `min`/`max`/`step`/`unit` are populated for numeric specs,
/// `options` for enumerated ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySpec {
    pub prop: String,
    pub entity_type: EntityType,
    pub writable: bool,
    pub data_type: DataType,
    pub unit: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub step: Option<f64>,
    pub options: Vec<ChoiceOption>,
    pub friendly_name_cz: String,
    pub friendly_name_en: String,
    pub device_class: Option<DeviceClass>,
    pub visibility: Option<VisibilityPredicate>,
    pub source_page: String,
}

/// Raw value from a live-value document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveValue {
    pub prop: String,
    pub raw_value: String,
    pub source_page: String,
}

/// Merged live values for one poll cycle. The same physical value is
/// echoed on several pages; the first occurrence wins, later pages are
/// only recorded as additional sources.
#[derive(Debug, Clone, Default)]
pub struct LiveSnapshot {
    values: BTreeMap<String, LiveValue>,
    prop_pages: BTreeMap<String, Vec<String>>,
}

impl LiveSnapshot {
    pub fn add(&mut self, value: LiveValue) {
        let pages = self.prop_pages.entry(value.prop.clone()).or_default();
        if !pages.contains(&value.source_page) {
            pages.push(value.source_page.clone());
        }
        self.values.entry(value.prop.clone()).or_insert(value);
    }

    pub fn get(&self, prop: &str) -> Option<&str> {
        self.values.get(prop).map(|v| v.raw_value.as_str())
    }

    pub fn pages_for(&self, prop: &str) -> &[String] {
        self.prop_pages.get(prop).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One entity of a published snapshot: a live value paired with its
/// descriptor spec when one exists. Built fresh every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedEntity {
    pub prop: String,
    pub spec: Option<EntitySpec>,
    pub value: String,
    /// Every page (descriptor and live) that mentioned this prop, in
    /// encounter order. Device assignment picks among these.
    pub source_pages: Vec<String>,
}

impl ResolvedEntity {
    pub fn has_descriptor(&self) -> bool {
        self.spec.is_some()
    }
}

/// Logical grouping of entities. Declaration order is priority order:
/// earlier variants claim shared props first, `Hidden` is the catch-all
/// for entities without a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Device {
    Spot,
    Pv,
    Bivalent,
    Circuits,
    HotWater,
    Status,
    Hidden,
}

impl Device {
    pub const PRIORITY: [Device; 7] = [
        Device::Spot,
        Device::Pv,
        Device::Bivalent,
        Device::Circuits,
        Device::HotWater,
        Device::Status,
        Device::Hidden,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Device::Spot => "SPOT",
            Device::Pv => "FVE",
            Device::Bivalent => "BIV",
            Device::Circuits => "OKRUH",
            Device::HotWater => "TUV",
            Device::Status => "STAVJED",
            Device::Hidden => "HIDDEN",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SPOT" => Some(Device::Spot),
            "FVE" => Some(Device::Pv),
            "BIV" => Some(Device::Bivalent),
            "OKRUH" => Some(Device::Circuits),
            "TUV" => Some(Device::HotWater),
            "STAVJED" => Some(Device::Status),
            "HIDDEN" => Some(Device::Hidden),
            _ => None,
        }
    }

    pub fn name_cz(&self) -> &'static str {
        match self {
            Device::Spot => "Spotov\u{00e9} ceny",
            Device::Pv => "Fotovoltaika",
            Device::Bivalent => "Bivalentn\u{00ed} zdroj",
            Device::Circuits => "Topn\u{00e9} okruhy",
            Device::HotWater => "Tepl\u{00e1} voda",
            Device::Status => "Stav jednotky",
            Device::Hidden => "Skryt\u{00e1} nastaven\u{00ed}",
        }
    }

    pub fn name_en(&self) -> &'static str {
        match self {
            Device::Spot => "Spot pricing",
            Device::Pv => "Photovoltaics",
            Device::Bivalent => "Bivalent heating",
            Device::Circuits => "Heating circuits",
            Device::HotWater => "Hot water",
            Device::Status => "Unit status",
            Device::Hidden => "Hidden settings",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Full result of one poll cycle, replaced wholesale on every successful
/// cycle. Devices with no entities are absent from the map.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub devices: BTreeMap<Device, Vec<ResolvedEntity>>,
}

impl Snapshot {
    pub fn iter(&self) -> impl Iterator<Item = (Device, &ResolvedEntity)> {
        self.devices
            .iter()
            .flat_map(|(dev, entities)| entities.iter().map(move |e| (*dev, e)))
    }

    pub fn entity(&self, prop: &str) -> Option<(Device, &ResolvedEntity)> {
        self.iter().find(|(_, e)| e.prop == prop)
    }

    pub fn len(&self) -> usize {
        self.devices.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Change notifications between consecutive published snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Event {
    ValueChanged { prop: String, old: String, new: String },
    EntityAppeared { prop: String, value: String },
    EntityVanished { prop: String },
}
