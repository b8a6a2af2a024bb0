/*!

This is the long-form manual for `uof_analytics` and `uoftab`.

## Pipeline overview

`uoftab` turns a denormalized incident table (one row per use-of-force event,
per-person attributes packed as comma-separated text) into:

* `uof_cit_<dataset>.csv` — one row per citizen;
* `uof_cit_officer_<dataset>.csv` — one row per (citizen, officer) pair;
* `coverage_population_<dataset>.csv` — apportioned population per coverage
  area and race category;
* `disparity_<dataset>.csv` — incident share, population share and disparity
  ratio per scope and race category;
* `summary_<dataset>.json` — a machine-readable summary of the disparity
  tables.

All processing is single-threaded and single-pass: the input table is loaded
whole, transformed, and written once. There are no time-of-run-dependent
values anywhere in the outputs, so re-running on identical input produces
byte-identical files.

## Cardinality reconciliation

The declared `Subject Count` and `Trooper/Officer Count` columns are
authoritative. When a delimited attribute list disagrees with them:

| list state            | names                 | races                     | force descriptors |
|-----------------------|-----------------------|---------------------------|-------------------|
| empty                 | all slots "Unknown"   | all slots absent          | all slots absent  |
| shorter than declared | pad tail with "Unknown" | broadcast FIRST token to every slot | pad tail with absent |
| longer than declared  | excess ignored by position | excess ignored by position | excess ignored by position |

The race broadcast is a documented compatibility behavior: it assumes all
under-specified citizens of an incident share one race. It is kept for
reproducibility and is intentionally not applied to any other field.

## Identifiers

All identifiers are SHA-256 digests of composed natural keys:

* tracking id — digest of the report number alone; identical in both
  expansion modes;
* citizen/officer uid — digest of (report number, role, position, name,
  race);
* interaction uid — digest of (report number, citizen position, officer
  position).

These are deterministic identity keys, not security primitives.

## Configuration

The run configuration is a single JSON file.

`outputSettings`:
- `datasetName` (string, required): suffix used for every output file name.
- `outputDirectory` (string, optional): where outputs are written; defaults
  to the current directory; overridden by the `--out-dir` flag.
- `agency` (string, optional): agency slug attached to every expanded row.
  Defaults to `louisiana-state-pd`.

`incidentFileSources` (array, required): the raw incident CSV files, merged
in order. Each entry has a `filePath` (relative paths resolve against the
configuration file's directory).

`censusSource` (required):
- `provider` (string): only `file` is currently supported. The provider
  abstraction keeps retrieval separate from aggregation; a network-based
  provider can be added behind the same interface.
- `filePath` (string): a JSON file with a `status` envelope and raw
  per-parish, per-variable counts.
- `datasetYear` (string): the census dataset year, echoed into requests.

`coverageAreas` (array, optional): the troop membership table. Each entry is
`{"troop": "Troop A", "parishes": [{"name": "Ascension"}, {"name": "St. James", "split": true}]}`.
A split parish carries weight 0.5 and must appear in exactly two areas. When
omitted, the built-in Louisiana State Police table is used.

`censusVariables` (object, optional): maps a race category label (`black`,
`white`, `hispanic`, `native_american`, `asian_pacific_islander`) to the list
of census variable names summed for that category. When omitted, the built-in
B01001 race-table age-group variables (ages 16 and over) are used, with the
Asian and Pacific Islander tables combined into one category.

## Disparity tables

For each scope (the overall dataset plus every coverage area):

* incident share % = category count / total incidents × 100 (0 when there
  are no incidents). The `unknown` category is part of the total.
* population share % = apportioned category population / total population ×
  100 (0 when the population is 0). `unknown` has no population baseline.
* disparity ratio = incident share / population share, reported only when
  the population share is strictly positive; otherwise `N/A`. A ratio above
  1.0 means over-representation.

Percentages are rounded to one decimal place for display; the ratio is
computed from the unrounded shares and displayed with two decimals.

*/
