/*!

# Quick start

This example shows how to go from a raw incident extract to the expanded
datasets and a disparity table, end to end, with the `uoftab` command line
tool. The raw extract is a CSV file in which each row is one use-of-force
event; the per-person attributes are packed as comma-separated lists:

```text
REN,Event Start Date,Troop,Subject Count,Trooper/Officer Count,Subject Full Name,Subject Race,Type of Force Used By Subject,Trooper/Officer Name,Trooper/Officer Race,Type of Force Used By Officer,# of Uses of Force,Justified (Y/N)
22-00123,2022-03-14,Troop A,2,1,"P One, P Two",Black,,O One,White,Takedown,1,Y
```

Write a minimal run configuration (see the [manual](../manual/index.html) for
every option):

```json
{
  "outputSettings": { "datasetName": "lsp_uof_22_24", "outputDirectory": "out" },
  "incidentFileSources": [ { "filePath": "lsp_uof_22_24.csv" } ],
  "censusSource": { "provider": "file", "filePath": "parish_population.json", "datasetYear": "2022" }
}
```

Then run:

```bash
uoftab --config run_config.json
```

The tool writes four CSV files to the output directory: the citizen-level
table (one row per citizen), the citizen-officer table (one row per
citizen-officer pair), the apportioned coverage-area population table, and the
disparity table (overall and per coverage area), plus a JSON summary. Running
the same command twice on the same input produces byte-identical files.

Using the library directly is a three-step affair: accumulate
[`IncidentRecord`](crate::IncidentRecord) values with a
[`Builder`](crate::builder::Builder), call
[`expand_citizen_level`](crate::expand_citizen_level) or
[`expand_interaction_level`](crate::expand_interaction_level), and feed the
aggregated counts together with an apportioned population into
[`compute_disparity`](crate::compute_disparity).

*/
