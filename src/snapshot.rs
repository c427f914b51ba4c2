// Read-side snapshot: all entities plus lookup indexes
//
// Loaded once after import and shared read-only across requests. The deep
// navigation of the relational model (country <-> subdivision <-> holiday)
// is flattened here into id-keyed maps and parent -> children indexes, so
// the query engine needs neither joins nor locking.

use anyhow::Result;
use rusqlite::Connection;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db;
use crate::entities::{Country, Holiday, Language, OUnit, Subdivision};
use crate::regions::RegionIndex;

pub struct Snapshot {
    pub countries: Vec<Country>,
    pub languages: Vec<Language>,
    pub subdivisions: Vec<Subdivision>,
    pub ounits: Vec<OUnit>,
    pub holidays: Vec<Holiday>,

    country_by_iso: HashMap<String, usize>,
    subdivision_by_id: HashMap<Uuid, usize>,
    ounit_by_id: HashMap<Uuid, usize>,

    pub subdivision_children: RegionIndex,
    pub ounit_children: RegionIndex,
}

impl Snapshot {
    /// Loads the full entity set from the store and builds the indexes.
    pub fn load(conn: &Connection) -> Result<Snapshot> {
        Ok(Snapshot::from_parts(
            db::load_countries(conn)?,
            db::load_languages(conn)?,
            db::load_subdivisions(conn)?,
            db::load_ounits(conn)?,
            db::load_holidays(conn)?,
        ))
    }

    pub fn from_parts(
        countries: Vec<Country>,
        languages: Vec<Language>,
        subdivisions: Vec<Subdivision>,
        ounits: Vec<OUnit>,
        holidays: Vec<Holiday>,
    ) -> Snapshot {
        let country_by_iso = countries
            .iter()
            .enumerate()
            .map(|(i, c)| (c.iso_code.clone(), i))
            .collect();
        let subdivision_by_id = subdivisions
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();
        let ounit_by_id = ounits.iter().enumerate().map(|(i, o)| (o.id, i)).collect();

        let subdivision_children =
            RegionIndex::build(subdivisions.iter().map(|s| (s.id, s.parent_id)));
        let ounit_children = RegionIndex::build(ounits.iter().map(|o| (o.id, o.parent_id)));

        Snapshot {
            countries,
            languages,
            subdivisions,
            ounits,
            holidays,
            country_by_iso,
            subdivision_by_id,
            ounit_by_id,
            subdivision_children,
            ounit_children,
        }
    }

    pub fn country_by_iso(&self, iso_code: &str) -> Option<&Country> {
        self.country_by_iso
            .get(iso_code)
            .map(|&i| &self.countries[i])
    }

    pub fn subdivision(&self, id: Uuid) -> Option<&Subdivision> {
        self.subdivision_by_id
            .get(&id)
            .map(|&i| &self.subdivisions[i])
    }

    pub fn ounit(&self, id: Uuid) -> Option<&OUnit> {
        self.ounit_by_id.get(&id).map(|&i| &self.ounits[i])
    }

    /// Region codes a holiday is scoped to, subdivisions first, in the
    /// order the references were imported.
    pub fn holiday_region_codes<'a>(
        &'a self,
        holiday: &'a Holiday,
    ) -> impl Iterator<Item = &'a str> + 'a {
        holiday
            .subdivision_ids
            .iter()
            .filter_map(|&id| self.subdivision(id).map(|s| s.code.as_str()))
            .chain(
                holiday
                    .ounit_ids
                    .iter()
                    .filter_map(|&id| self.ounit(id).map(|o| o.code.as_str())),
            )
    }
}
